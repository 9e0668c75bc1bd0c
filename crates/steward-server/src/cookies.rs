// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Signed browser cookies: the active session and the stashed admin
//! session used while impersonating.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_common_secret::SecretString;
use steward_server_auth::TokenPair;
use steward_server_config::{SessionConfig, MIN_COOKIE_SECRET_LEN};
use steward_server_impersonation::{SessionStash, StashError};
use tower_cookies::cookie::{time, SameSite};
use tower_cookies::{Cookie, Cookies, Key};

pub const SESSION_COOKIE: &str = "steward_session";
pub const ORIGINAL_SESSION_COOKIE: &str = "original_session";
pub const CODE_VERIFIER_COOKIE: &str = "steward_code_verifier";

#[derive(Debug, thiserror::Error)]
pub enum CookieKeyError {
	#[error("cookie secret must be at least {MIN_COOKIE_SECRET_LEN} bytes")]
	TooShort,
}

/// Derives the signing key from the configured secret, or generates a
/// random one when none is set.
pub fn cookie_key(secret: Option<&SecretString>) -> Result<Key, CookieKeyError> {
	match secret {
		Some(secret) => {
			Key::try_from(secret.expose().as_bytes()).map_err(|_| CookieKeyError::TooShort)
		}
		None => {
			tracing::warn!("no cookie secret configured; sessions will not survive a restart");
			Ok(Key::generate())
		}
	}
}

fn build_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
	Cookie::build((name, value))
		.path("/")
		.http_only(true)
		.secure(secure)
		.same_site(SameSite::Lax)
		.max_age(time::Duration::seconds(max_age_secs))
		.build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
	Cookie::build((name, ""))
		.path("/")
		.http_only(true)
		.secure(secure)
		.same_site(SameSite::Lax)
		.max_age(time::Duration::ZERO)
		.build()
}

#[derive(Serialize, Deserialize)]
struct SessionCookie {
	access_token: String,
	refresh_token: String,
}

/// Reads the active session's tokens. Missing, unsigned or malformed
/// cookies read as no session.
pub fn read_session(cookies: &Cookies, key: &Key) -> Option<TokenPair> {
	let cookie = cookies.signed(key).get(SESSION_COOKIE)?;
	let parsed: SessionCookie = serde_json::from_str(cookie.value()).ok()?;
	TokenPair::new(parsed.access_token, parsed.refresh_token)
}

pub fn write_session(cookies: &Cookies, key: &Key, config: &SessionConfig, tokens: &TokenPair) {
	let value = serde_json::json!({
		"access_token": tokens.access_token().expose(),
		"refresh_token": tokens.refresh_token().expose(),
	})
	.to_string();
	cookies.signed(key).add(build_cookie(
		SESSION_COOKIE,
		value,
		config.max_age_secs,
		config.secure_cookies,
	));
}

pub fn clear_session(cookies: &Cookies, config: &SessionConfig) {
	cookies.add(removal_cookie(SESSION_COOKIE, config.secure_cookies));
}

/// The PKCE verifier stored when a sign-in was started elsewhere.
pub fn take_code_verifier(cookies: &Cookies, key: &Key, config: &SessionConfig) -> Option<String> {
	let verifier = cookies
		.signed(key)
		.get(CODE_VERIFIER_COOKIE)
		.map(|c| c.value().to_string())
		.filter(|v| !v.is_empty());
	if verifier.is_some() {
		cookies.add(removal_cookie(CODE_VERIFIER_COOKIE, config.secure_cookies));
	}
	verifier
}

/// [`SessionStash`] backed by the signed `original_session` cookie.
pub struct CookieStash {
	cookies: Cookies,
	key: Key,
	secure: bool,
}

impl CookieStash {
	pub fn new(cookies: Cookies, key: Key, secure: bool) -> Self {
		Self {
			cookies,
			key,
			secure,
		}
	}
}

#[async_trait]
impl SessionStash for CookieStash {
	async fn load(&self) -> Result<Option<String>, StashError> {
		Ok(self
			.cookies
			.signed(&self.key)
			.get(ORIGINAL_SESSION_COOKIE)
			.map(|c| c.value().to_string())
			.filter(|v| !v.is_empty()))
	}

	async fn store(&self, envelope: &str, ttl: Duration) -> Result<(), StashError> {
		let max_age = i64::try_from(ttl.as_secs())
			.map_err(|_| StashError::Unavailable("stash lifetime out of range".to_string()))?;
		self.cookies.signed(&self.key).add(build_cookie(
			ORIGINAL_SESSION_COOKIE,
			envelope.to_string(),
			max_age,
			self.secure,
		));
		Ok(())
	}

	async fn remove(&self) -> Result<(), StashError> {
		self.cookies
			.add(removal_cookie(ORIGINAL_SESSION_COOKIE, self.secure));
		Ok(())
	}
}
