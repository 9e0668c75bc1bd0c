// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The start-impersonation flow as an explicit state machine.
//!
//! ```text
//! Idle -> Validating -> Stashing -> Resolving -> LinkGenerating
//!      -> TokenExtracting -> Redirecting
//! ```
//!
//! Any step may move to `Failed`. `Redirecting` and `Failed` are terminal.
//! The stash is written before the identity provider is contacted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use steward_server_auth::{AuthUser, Session, TokenPair, UserId};
use steward_server_config::StashPolicy;
use steward_server_gotrue::{GeneratedLink, IdentityProvider, LinkType};
use tracing::{debug, instrument, warn};

use crate::envelope;
use crate::error::{ErrorKind, ImpersonationError, Stage};
use crate::extractor::extract_tokens;
use crate::stash::SessionStash;

/// Collaborators and limits for one start attempt.
pub struct StartContext<'a> {
	pub provider: &'a dyn IdentityProvider,
	pub stash: &'a dyn SessionStash,
	pub stash_policy: StashPolicy,
	pub stash_ttl: Duration,
	/// Bound on each identity provider call.
	pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StartRequest {
	/// The signed-in admin, if any.
	pub admin: Option<Session>,
	pub target_id: UserId,
}

#[derive(Debug)]
pub enum State {
	Idle,
	Validating(StartRequest),
	Stashing {
		admin: Session,
		target_id: UserId,
	},
	Resolving {
		admin: Session,
		target_id: UserId,
	},
	LinkGenerating {
		admin: Session,
		target: AuthUser,
	},
	TokenExtracting {
		admin: Session,
		target: AuthUser,
		link: GeneratedLink,
	},
	Redirecting {
		admin: Session,
		target: AuthUser,
		tokens: TokenPair,
	},
	Failed(ImpersonationError),
}

impl State {
	/// Accepts an impersonation request.
	pub fn receive(request: StartRequest) -> Self {
		State::Validating(request)
	}

	pub fn stage(&self) -> Option<Stage> {
		match self {
			State::Validating(_) => Some(Stage::Validating),
			State::Stashing { .. } => Some(Stage::Stashing),
			State::Resolving { .. } => Some(Stage::Resolving),
			State::LinkGenerating { .. } => Some(Stage::LinkGenerating),
			State::TokenExtracting { .. } => Some(Stage::TokenExtracting),
			State::Idle | State::Redirecting { .. } | State::Failed(_) => None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, State::Redirecting { .. } | State::Failed(_))
	}

	/// Performs one transition. `Idle` and terminal states are returned
	/// unchanged.
	pub async fn step(self, ctx: &StartContext<'_>) -> State {
		let result = match self {
			State::Validating(request) => validate(ctx, request).await,
			State::Stashing { admin, target_id } => stash(ctx, admin, target_id).await,
			State::Resolving { admin, target_id } => resolve(ctx, admin, target_id).await,
			State::LinkGenerating { admin, target } => generate_link(ctx, admin, target).await,
			State::TokenExtracting {
				admin,
				target,
				link,
			} => extract(ctx, admin, target, link).await,
			other => return other,
		};
		result.unwrap_or_else(State::Failed)
	}
}

/// Drives a request to a terminal state.
///
/// On success returns the admin session, the resolved target and the
/// target's token pair.
#[instrument(skip_all, fields(target_id = %request.target_id))]
pub async fn run(
	ctx: &StartContext<'_>,
	request: StartRequest,
) -> Result<(Session, AuthUser, TokenPair), ImpersonationError> {
	let mut state = State::receive(request);
	loop {
		if let Some(stage) = state.stage() {
			debug!(%stage, "impersonation step");
		}
		state = state.step(ctx).await;
		match state {
			State::Redirecting {
				admin,
				target,
				tokens,
			} => return Ok((admin, target, tokens)),
			State::Failed(err) => {
				warn!(stage = %err.stage, kind = ?err.kind, error = %err.message, "impersonation failed");
				return Err(err);
			}
			State::Idle => {
				return Err(ImpersonationError::invalid(
					Stage::Validating,
					"No impersonation request",
				))
			}
			other => state = other,
		}
	}
}

async fn bounded<T, E, F>(
	timeout: Duration,
	stage: Stage,
	what: &str,
	call: F,
) -> Result<T, ImpersonationError>
where
	E: Display,
	F: Future<Output = Result<T, E>>,
{
	match tokio::time::timeout(timeout, call).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(e)) => Err(ImpersonationError::upstream(
			stage,
			format!("{what} failed: {e}"),
		)),
		Err(_) => Err(ImpersonationError::upstream(
			stage,
			format!("{what} timed out"),
		)),
	}
}

pub async fn validate(
	ctx: &StartContext<'_>,
	request: StartRequest,
) -> Result<State, ImpersonationError> {
	let Some(admin) = request.admin else {
		return Err(ImpersonationError::unauthenticated(Stage::Validating));
	};
	if request.target_id.is_empty() {
		return Err(
			ImpersonationError::invalid(Stage::Validating, "User ID is required")
				.with_field("user_id"),
		);
	}
	if request.target_id == admin.user_id {
		return Err(
			ImpersonationError::invalid(Stage::Validating, "Cannot impersonate yourself")
				.with_field("user_id"),
		);
	}

	if ctx.stash_policy == StashPolicy::Reject {
		let existing = ctx.stash.load().await.map_err(|e| {
			ImpersonationError::upstream(Stage::Validating, format!("reading stash failed: {e}"))
		})?;
		// Only a stash that decodes counts; a corrupted one is replaced.
		let active = match existing {
			Some(raw) => match envelope::decode(&raw) {
				Ok(_) => true,
				Err(e) => {
					warn!(error = %e, "replacing corrupted stashed session");
					false
				}
			},
			None => false,
		};
		if active {
			return Err(ImpersonationError::new(
				ErrorKind::Conflict,
				Stage::Validating,
				"Already impersonating another user. Stop current impersonation first.",
			));
		}
	}

	Ok(State::Stashing {
		admin,
		target_id: request.target_id,
	})
}

pub async fn stash(
	ctx: &StartContext<'_>,
	admin: Session,
	target_id: UserId,
) -> Result<State, ImpersonationError> {
	ctx.stash
		.store(&envelope::encode(&admin), ctx.stash_ttl)
		.await
		.map_err(|e| {
			ImpersonationError::upstream(
				Stage::Stashing,
				format!("saving original session failed: {e}"),
			)
		})?;
	Ok(State::Resolving { admin, target_id })
}

pub async fn resolve(
	ctx: &StartContext<'_>,
	admin: Session,
	target_id: UserId,
) -> Result<State, ImpersonationError> {
	let target = bounded(
		ctx.timeout,
		Stage::Resolving,
		"looking up user",
		ctx.provider.get_user_by_id(&target_id),
	)
	.await?
	.ok_or_else(|| ImpersonationError::not_found(Stage::Resolving, "User not found"))?;
	Ok(State::LinkGenerating { admin, target })
}

pub async fn generate_link(
	ctx: &StartContext<'_>,
	admin: Session,
	target: AuthUser,
) -> Result<State, ImpersonationError> {
	let Some(email) = target.email.as_deref().filter(|e| !e.is_empty()) else {
		return Err(ImpersonationError::invalid(
			Stage::LinkGenerating,
			"User has no email address",
		));
	};
	let link = bounded(
		ctx.timeout,
		Stage::LinkGenerating,
		"generating sign-in link",
		ctx.provider.generate_link(LinkType::Magiclink, email),
	)
	.await?;
	Ok(State::TokenExtracting {
		admin,
		target,
		link,
	})
}

pub async fn extract(
	ctx: &StartContext<'_>,
	admin: Session,
	target: AuthUser,
	link: GeneratedLink,
) -> Result<State, ImpersonationError> {
	let tokens = bounded(
		ctx.timeout,
		Stage::TokenExtracting,
		"extracting tokens",
		extract_tokens(ctx.provider, &link),
	)
	.await?;
	Ok(State::Redirecting {
		admin,
		target,
		tokens,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stash::MemoryStash;
	use steward_server_gotrue::testing::FakeIdentityProvider;

	struct Fixture {
		provider: FakeIdentityProvider,
		stash: MemoryStash,
		admin: Session,
	}

	fn fixture() -> Fixture {
		let provider = FakeIdentityProvider::new();
		provider.add_user("a1", Some("admin@example.com"));
		provider.add_user("u1", Some("user@example.com"));
		let admin = provider.sign_in("a1");
		Fixture {
			provider,
			stash: MemoryStash::new(),
			admin,
		}
	}

	fn ctx<'a>(f: &'a Fixture) -> StartContext<'a> {
		StartContext {
			provider: &f.provider,
			stash: &f.stash,
			stash_policy: StashPolicy::Reject,
			stash_ttl: Duration::from_secs(86_400),
			timeout: Duration::from_secs(5),
		}
	}

	fn request(f: &Fixture, target: &str) -> StartRequest {
		StartRequest {
			admin: Some(f.admin.clone()),
			target_id: UserId::new(target),
		}
	}

	#[tokio::test]
	async fn walks_every_state_in_order() {
		let f = fixture();
		let ctx = ctx(&f);
		let mut state = State::receive(request(&f, "u1"));
		let mut stages = Vec::new();
		while !state.is_terminal() {
			stages.extend(state.stage());
			state = state.step(&ctx).await;
		}
		assert_eq!(
			stages,
			vec![
				Stage::Validating,
				Stage::Stashing,
				Stage::Resolving,
				Stage::LinkGenerating,
				Stage::TokenExtracting,
			]
		);
		assert!(matches!(state, State::Redirecting { ref target, .. } if target.id.as_str() == "u1"));
	}

	#[tokio::test]
	async fn idle_and_terminal_states_do_not_move() {
		let f = fixture();
		let ctx = ctx(&f);
		assert!(matches!(State::Idle.step(&ctx).await, State::Idle));
		let failed = State::Failed(ImpersonationError::unauthenticated(Stage::Validating));
		assert!(matches!(failed.step(&ctx).await, State::Failed(_)));
	}

	#[tokio::test]
	async fn missing_admin_is_unauthenticated() {
		let f = fixture();
		let err = validate(
			&ctx(&f),
			StartRequest {
				admin: None,
				target_id: UserId::new("u1"),
			},
		)
		.await
		.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Unauthenticated);
	}

	#[tokio::test]
	async fn blank_target_is_invalid() {
		let f = fixture();
		let err = validate(&ctx(&f), request(&f, " ")).await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::InvalidRequest);
		assert_eq!(err.message, "User ID is required");
		assert_eq!(err.fields, vec!["user_id"]);
	}

	#[tokio::test]
	async fn existing_stash_conflicts_under_reject() {
		let f = fixture();
		f.stash
			.store(&envelope::encode(&f.admin), Duration::from_secs(1))
			.await
			.unwrap();
		let err = validate(&ctx(&f), request(&f, "u1")).await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Conflict);
	}

	#[tokio::test]
	async fn corrupted_stash_does_not_conflict() {
		let f = fixture();
		f.stash.store("{}", Duration::from_secs(1)).await.unwrap();
		let next = validate(&ctx(&f), request(&f, "u1")).await.unwrap();
		assert!(matches!(next, State::Stashing { .. }));
	}

	#[tokio::test]
	async fn existing_stash_is_ignored_under_overwrite() {
		let f = fixture();
		f.stash.store("{}", Duration::from_secs(1)).await.unwrap();
		let mut ctx = ctx(&f);
		ctx.stash_policy = StashPolicy::Overwrite;
		let next = validate(&ctx, request(&f, "u1")).await.unwrap();
		assert!(matches!(next, State::Stashing { .. }));
	}

	#[tokio::test]
	async fn stash_holds_admin_envelope_with_ttl() {
		let f = fixture();
		stash(&ctx(&f), f.admin.clone(), UserId::new("u1"))
			.await
			.unwrap();
		let stored = envelope::decode(&f.stash.envelope().unwrap()).unwrap();
		assert_eq!(stored, f.admin);
		assert_eq!(f.stash.ttl(), Some(Duration::from_secs(86_400)));
	}

	#[tokio::test]
	async fn unknown_target_is_not_found() {
		let f = fixture();
		let err = resolve(&ctx(&f), f.admin.clone(), UserId::new("ghost"))
			.await
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::NotFound);
		assert_eq!(err.stage, Stage::Resolving);
	}

	#[tokio::test]
	async fn provider_failure_while_resolving_is_upstream() {
		let f = fixture();
		f.provider.fail("get_user_by_id");
		let err = resolve(&ctx(&f), f.admin.clone(), UserId::new("u1"))
			.await
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Upstream);
	}

	#[tokio::test]
	async fn target_without_email_is_invalid() {
		let f = fixture();
		let target = f.provider.add_user("u2", None);
		let err = generate_link(&ctx(&f), f.admin.clone(), target)
			.await
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::InvalidRequest);
		assert_eq!(f.provider.call_count("generate_link"), 0);
	}

	#[tokio::test]
	async fn incomplete_tokens_surface_as_upstream() {
		let f = fixture();
		let target = f.provider.user("u1").unwrap();
		let link = GeneratedLink {
			action_link: "https://backend.test/verify?access_token=only".to_string(),
			hashed_token: None,
		};
		let err = extract(&ctx(&f), f.admin.clone(), target, link)
			.await
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Upstream);
		assert_eq!(err.stage, Stage::TokenExtracting);
	}

	#[tokio::test]
	async fn slow_provider_times_out() {
		let f = fixture();
		f.provider.set_delay(Duration::from_millis(500));
		let mut ctx = ctx(&f);
		ctx.timeout = Duration::from_millis(20);
		let err = resolve(&ctx, f.admin.clone(), UserId::new("u1"))
			.await
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::Upstream);
		assert!(err.message.contains("timed out"));
	}
}
