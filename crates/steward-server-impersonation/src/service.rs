// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use steward_server_audit::{AuditAction, AuditLogBuilder, AuditService};
use steward_server_auth::{Session, TokenPair, UserId};
use steward_server_config::ImpersonationConfig;
use steward_server_db::{restore_last_sign_in, DataStore};
use steward_server_gotrue::IdentityProvider;
use tracing::{info, instrument, warn};

use crate::envelope;
use crate::error::{ErrorKind, ImpersonationError, Stage};
use crate::machine::{self, StartContext, StartRequest};
use crate::stash::SessionStash;

/// Where to send the browser next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
	location: String,
}

impl Redirect {
	pub fn to(location: impl Into<String>) -> Self {
		Self {
			location: location.into(),
		}
	}

	pub fn location(&self) -> &str {
		&self.location
	}
}

/// Result of stopping: the admin's re-established session and where to go.
#[derive(Debug, Clone)]
pub struct Stopped {
	pub redirect: Redirect,
	pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpersonationState {
	pub is_impersonating: bool,
	pub original_user_email: Option<String>,
}

pub struct ImpersonationService {
	provider: Arc<dyn IdentityProvider>,
	store: Arc<dyn DataStore>,
	audit: AuditService,
	config: ImpersonationConfig,
	timeout: Duration,
	locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

/// A path that needs no escaping in a query value.
fn is_plain_path(path: &str) -> bool {
	path.starts_with('/')
		&& path
			.bytes()
			.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'-' | b'_' | b'.' | b'~'))
}

fn callback_location(callback_path: &str, tokens: &TokenPair, next: &str) -> String {
	let mut query = url::form_urlencoded::Serializer::new(String::new());
	query
		.append_pair("access_token", tokens.access_token().expose())
		.append_pair("refresh_token", tokens.refresh_token().expose());
	if is_plain_path(next) {
		format!("{callback_path}?{}&next={next}", query.finish())
	} else {
		format!("{callback_path}?{}", query.append_pair("next", next).finish())
	}
}

impl ImpersonationService {
	pub fn new(
		provider: Arc<dyn IdentityProvider>,
		store: Arc<dyn DataStore>,
		audit: AuditService,
		config: ImpersonationConfig,
	) -> Self {
		let timeout = config.upstream_timeout();
		Self {
			provider,
			store,
			audit,
			config,
			timeout,
			locks: Mutex::new(HashMap::new()),
		}
	}

	/// Overrides the per-call upstream timeout from the config.
	pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn config(&self) -> &ImpersonationConfig {
		&self.config
	}

	pub fn stash_ttl(&self) -> Duration {
		Duration::from_secs(self.config.stash_ttl_secs.max(0) as u64)
	}

	fn admin_lock(&self, admin_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
		let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
		locks.entry(admin_id.clone()).or_default().clone()
	}

	/// Drops the admin's lock entry once no start holds or awaits it.
	fn release_admin_lock(&self, admin_id: &UserId, lock: Arc<tokio::sync::Mutex<()>>) {
		drop(lock);
		let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
		if locks
			.get(admin_id)
			.is_some_and(|entry| Arc::strong_count(entry) == 1)
		{
			locks.remove(admin_id);
		}
	}

	#[cfg(test)]
	fn tracked_admins(&self) -> usize {
		self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
	}

	/// Starts impersonating `target_id` as `admin`.
	///
	/// Starts by the same admin run one at a time.
	#[instrument(
		skip(self, admin, stash, ip_address),
		fields(actor_id = admin.map(|a| a.user_id.as_str()), target_id = %target_id)
	)]
	pub async fn start(
		&self,
		admin: Option<&Session>,
		target_id: &UserId,
		stash: &dyn SessionStash,
		ip_address: Option<&str>,
	) -> Result<Redirect, ImpersonationError> {
		let Some(admin_session) = admin else {
			return self.run_start(None, target_id, stash, ip_address).await;
		};
		let lock = self.admin_lock(&admin_session.user_id);
		let result = {
			let _guard = lock.lock().await;
			self.run_start(admin, target_id, stash, ip_address).await
		};
		self.release_admin_lock(&admin_session.user_id, lock);
		result
	}

	async fn run_start(
		&self,
		admin: Option<&Session>,
		target_id: &UserId,
		stash: &dyn SessionStash,
		ip_address: Option<&str>,
	) -> Result<Redirect, ImpersonationError> {
		let ctx = StartContext {
			provider: self.provider.as_ref(),
			stash,
			stash_policy: self.config.stash_policy,
			stash_ttl: self.stash_ttl(),
			timeout: self.timeout,
		};
		let outcome = machine::run(
			&ctx,
			StartRequest {
				admin: admin.cloned(),
				target_id: target_id.clone(),
			},
		)
		.await;
		let (admin, target, tokens) = match outcome {
			Ok(outcome) => outcome,
			Err(err) => {
				if err.stage.is_after_stashing() {
					if let Err(e) = stash.remove().await {
						warn!(error = %e, "failed to discard stashed session after failed start");
					}
				}
				return Err(err);
			}
		};

		if self.config.restore_last_sign_in {
			if let Some(at) = target.last_sign_in_at {
				match tokio::time::timeout(
					self.timeout,
					restore_last_sign_in(self.store.as_ref(), &target.id, at),
				)
				.await
				{
					Ok(Ok(())) => {}
					Ok(Err(e)) => warn!(error = %e, "failed to restore last sign-in time"),
					Err(_) => warn!("restoring last sign-in time timed out"),
				}
			}
		}

		let entry = AuditLogBuilder::new(AuditAction::ImpersonateUser)
			.actor(admin.user_id.clone())
			.entity(target.id.as_str())
			.ip_address_opt(ip_address.map(str::to_string))
			.metadata(json!({
				"impersonated_user_email": target.email,
				"admin_user_email": admin.user_email,
			}))
			.build();
		if let Err(e) = self.audit.record(entry).await {
			warn!(error = %e, "failed to record impersonation audit entry");
		}

		info!(actor_id = %admin.user_id, target_id = %target.id, "Admin started impersonation");
		Ok(Redirect::to(callback_location(
			&self.config.callback_path,
			&tokens,
			&self.config.landing_path,
		)))
	}

	/// Restores the stashed admin session.
	///
	/// `current_user` is the impersonated account, if known, for the audit
	/// entry.
	#[instrument(skip(self, stash, current_user, ip_address))]
	pub async fn stop(
		&self,
		stash: &dyn SessionStash,
		current_user: Option<&UserId>,
		ip_address: Option<&str>,
	) -> Result<Stopped, ImpersonationError> {
		let envelope = stash
			.load()
			.await
			.map_err(|e| {
				ImpersonationError::upstream(Stage::Loading, format!("reading stash failed: {e}"))
			})?
			.ok_or_else(|| {
				ImpersonationError::not_found(Stage::Loading, "No original session found")
			})?;

		let original = envelope::decode(&envelope).map_err(|e| {
			warn!(error = %e, "stashed session is corrupted");
			ImpersonationError::new(
				ErrorKind::Corrupted,
				Stage::Decoding,
				"Original session is corrupted",
			)
		})?;

		let session = match tokio::time::timeout(
			self.timeout,
			self.provider.set_session(&original.tokens),
		)
		.await
		{
			Ok(Ok(session)) => session,
			Ok(Err(e)) => {
				return Err(ImpersonationError::upstream(
					Stage::Restoring,
					format!("restoring session failed: {e}"),
				))
			}
			Err(_) => {
				return Err(ImpersonationError::upstream(
					Stage::Restoring,
					"restoring session timed out",
				))
			}
		};

		if let Err(e) = stash.remove().await {
			warn!(error = %e, "failed to clear stashed session");
		}

		let mut entry = AuditLogBuilder::new(AuditAction::StopImpersonation)
			.actor(session.user_id.clone())
			.ip_address_opt(ip_address.map(str::to_string))
			.metadata(json!({
				"admin_user_email": session.user_email,
				"impersonated_user_id": current_user.map(UserId::as_str),
			}));
		if let Some(user) = current_user {
			entry = entry.entity(user.as_str());
		}
		if let Err(e) = self.audit.record(entry.build()).await {
			warn!(error = %e, "failed to record stop-impersonation audit entry");
		}

		info!(actor_id = %session.user_id, "Admin stopped impersonation");
		Ok(Stopped {
			redirect: Redirect::to(self.config.return_path.clone()),
			session,
		})
	}

	/// Whether an original session is stashed. Unreadable stashes report
	/// as not impersonating.
	pub async fn state(&self, stash: &dyn SessionStash) -> ImpersonationState {
		let not_impersonating = ImpersonationState {
			is_impersonating: false,
			original_user_email: None,
		};
		match stash.load().await {
			Ok(Some(envelope)) => match envelope::decode(&envelope) {
				Ok(original) => ImpersonationState {
					is_impersonating: true,
					original_user_email: original.user_email,
				},
				Err(e) => {
					warn!(error = %e, "ignoring corrupted stashed session");
					not_impersonating
				}
			},
			Ok(None) => not_impersonating,
			Err(e) => {
				warn!(error = %e, "failed to read stashed session");
				not_impersonating
			}
		}
	}
}
