// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory identity provider for tests.
//!
//! Records every call by method name, supports injected failures and an
//! artificial delay, and issues deterministic tokens.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use steward_common_secret::SecretString;
use steward_server_auth::{AuthUser, Session, TokenPair, UserId};

use crate::error::ProviderError;
use crate::provider::IdentityProvider;
use crate::types::{CreateUserRequest, GeneratedLink, LinkType};

#[derive(Default)]
struct State {
	users: HashMap<UserId, AuthUser>,
	/// access token -> session
	sessions: HashMap<String, Session>,
	/// refresh token -> session issued on refresh
	refreshes: HashMap<String, Session>,
	/// hashed token -> session issued on verification
	otps: HashMap<String, Session>,
	/// email -> canned link
	links: HashMap<String, GeneratedLink>,
	/// (code, verifier) -> session
	codes: HashMap<(String, String), Session>,
	failing: HashSet<&'static str>,
	delay: Option<Duration>,
	calls: Vec<&'static str>,
	counter: u64,
}

#[derive(Default)]
pub struct FakeIdentityProvider {
	state: Mutex<State>,
}

fn lock(m: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
	m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeIdentityProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_user(&self, id: &str, email: Option<&str>) -> AuthUser {
		let user = AuthUser {
			id: UserId::new(id),
			email: email.map(str::to_string),
			created_at: None,
			last_sign_in_at: None,
		};
		lock(&self.state).users.insert(user.id.clone(), user.clone());
		user
	}

	pub fn insert_user(&self, user: AuthUser) {
		lock(&self.state).users.insert(user.id.clone(), user);
	}

	pub fn user(&self, id: &str) -> Option<AuthUser> {
		lock(&self.state).users.get(&UserId::new(id)).cloned()
	}

	/// Makes `set_session` and `get_user` accept the session's tokens.
	pub fn register_session(&self, session: Session) {
		let access = session.tokens.access_token().expose().clone();
		lock(&self.state).sessions.insert(access, session);
	}

	/// Issues a signed-in session for a known user and registers it.
	pub fn sign_in(&self, id: &str) -> Session {
		let email = lock(&self.state)
			.users
			.get(&UserId::new(id))
			.and_then(|u| u.email.clone());
		let session = self.mint_session(&UserId::new(id), email);
		self.register_session(session.clone());
		session
	}

	/// Makes `set_session` with an unknown access token fall back to this
	/// refresh token.
	pub fn register_refresh(&self, refresh_token: &str, session: Session) {
		lock(&self.state)
			.refreshes
			.insert(refresh_token.to_string(), session);
	}

	pub fn register_code(&self, code: &str, verifier: &str, session: Session) {
		lock(&self.state)
			.codes
			.insert((code.to_string(), verifier.to_string()), session);
	}

	/// Overrides the link returned for `email`. Without an override, links
	/// carry no tokens and a hashed token that `verify_otp` accepts.
	pub fn set_link(&self, email: &str, action_link: &str, hashed_token: Option<&str>) {
		lock(&self.state).links.insert(
			email.to_string(),
			GeneratedLink {
				action_link: action_link.to_string(),
				hashed_token: hashed_token.map(str::to_string),
			},
		);
	}

	/// Makes `method` fail with a 500 rejection.
	pub fn fail(&self, method: &'static str) {
		lock(&self.state).failing.insert(method);
	}

	/// Delays every call.
	pub fn set_delay(&self, delay: Duration) {
		lock(&self.state).delay = Some(delay);
	}

	pub fn calls(&self) -> Vec<&'static str> {
		lock(&self.state).calls.clone()
	}

	pub fn call_count(&self, method: &str) -> usize {
		lock(&self.state)
			.calls
			.iter()
			.filter(|c| **c == method)
			.count()
	}

	fn mint_session(&self, user_id: &UserId, email: Option<String>) -> Session {
		let n = {
			let mut state = lock(&self.state);
			state.counter += 1;
			state.counter
		};
		let tokens = TokenPair::new(
			format!("access-{user_id}-{n}"),
			format!("refresh-{user_id}-{n}"),
		);
		match tokens {
			Some(tokens) => Session::new(tokens, user_id.clone(), email),
			None => unreachable!("minted tokens are never empty"),
		}
	}

	async fn enter(&self, method: &'static str) -> Result<(), ProviderError> {
		let (delay, failing) = {
			let mut state = lock(&self.state);
			state.calls.push(method);
			(state.delay, state.failing.contains(method))
		};
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if failing {
			return Err(ProviderError::Rejected {
				status: 500,
				message: format!("{method} failed"),
			});
		}
		Ok(())
	}
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<AuthUser>, ProviderError> {
		self.enter("get_user_by_id").await?;
		Ok(lock(&self.state).users.get(id).cloned())
	}

	async fn list_users(&self, page: u32, per_page: u32) -> Result<Vec<AuthUser>, ProviderError> {
		self.enter("list_users").await?;
		let mut users: Vec<AuthUser> = lock(&self.state).users.values().cloned().collect();
		users.sort_by(|a, b| a.id.cmp(&b.id));
		let skip = page.saturating_sub(1) as usize * per_page as usize;
		Ok(users.into_iter().skip(skip).take(per_page as usize).collect())
	}

	async fn create_user(&self, request: &CreateUserRequest) -> Result<AuthUser, ProviderError> {
		self.enter("create_user").await?;
		let mut state = lock(&self.state);
		if state
			.users
			.values()
			.any(|u| u.email.as_deref() == Some(request.email.as_str()))
		{
			return Err(ProviderError::Rejected {
				status: 422,
				message: "A user with this email address has already been registered".to_string(),
			});
		}
		state.counter += 1;
		let user = AuthUser {
			id: UserId::new(format!("user-{}", state.counter)),
			email: Some(request.email.clone()),
			created_at: None,
			last_sign_in_at: None,
		};
		state.users.insert(user.id.clone(), user.clone());
		Ok(user)
	}

	async fn update_user_email(
		&self,
		id: &UserId,
		email: &str,
	) -> Result<AuthUser, ProviderError> {
		self.enter("update_user_email").await?;
		let mut state = lock(&self.state);
		let user = state.users.get_mut(id).ok_or(ProviderError::NotFound)?;
		user.email = Some(email.to_string());
		Ok(user.clone())
	}

	async fn generate_link(
		&self,
		link_type: LinkType,
		email: &str,
	) -> Result<GeneratedLink, ProviderError> {
		self.enter("generate_link").await?;
		if let Some(link) = lock(&self.state).links.get(email).cloned() {
			return Ok(link);
		}

		let user_id = lock(&self.state)
			.users
			.values()
			.find(|u| u.email.as_deref() == Some(email))
			.map(|u| u.id.clone())
			.ok_or(ProviderError::NotFound)?;
		let session = self.mint_session(&user_id, Some(email.to_string()));
		let hashed_token = format!("hash-{user_id}");
		let action_link = format!(
			"https://backend.test/auth/v1/verify?token={hashed_token}&type={}",
			link_type.as_str()
		);
		lock(&self.state).otps.insert(hashed_token.clone(), session);
		Ok(GeneratedLink {
			action_link,
			hashed_token: Some(hashed_token),
		})
	}

	async fn verify_otp(
		&self,
		token_hash: &str,
		_link_type: LinkType,
	) -> Result<Session, ProviderError> {
		self.enter("verify_otp").await?;
		let session = lock(&self.state)
			.otps
			.remove(token_hash)
			.ok_or(ProviderError::Unauthorized)?;
		self.register_session(session.clone());
		Ok(session)
	}

	async fn set_session(&self, tokens: &TokenPair) -> Result<Session, ProviderError> {
		self.enter("set_session").await?;
		let mut state = lock(&self.state);
		if let Some(session) = state.sessions.get(tokens.access_token().expose()) {
			return Ok(session.clone());
		}
		let refreshed = state
			.refreshes
			.remove(tokens.refresh_token().expose())
			.ok_or(ProviderError::Unauthorized)?;
		state.sessions.insert(
			refreshed.tokens.access_token().expose().clone(),
			refreshed.clone(),
		);
		Ok(refreshed)
	}

	async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, ProviderError> {
		self.enter("get_user").await?;
		let state = lock(&self.state);
		let session = state
			.sessions
			.get(access_token.expose())
			.ok_or(ProviderError::Unauthorized)?;
		Ok(state
			.users
			.get(&session.user_id)
			.cloned()
			.unwrap_or_else(|| AuthUser {
				id: session.user_id.clone(),
				email: session.user_email.clone(),
				created_at: None,
				last_sign_in_at: None,
			}))
	}

	async fn exchange_code_for_session(
		&self,
		code: &str,
		code_verifier: &str,
	) -> Result<Session, ProviderError> {
		self.enter("exchange_code_for_session").await?;
		let session = lock(&self.state)
			.codes
			.remove(&(code.to_string(), code_verifier.to_string()))
			.ok_or(ProviderError::Unauthorized)?;
		self.register_session(session.clone());
		Ok(session)
	}
}
