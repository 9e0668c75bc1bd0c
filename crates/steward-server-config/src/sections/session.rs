// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser session cookie configuration.

use serde::Deserialize;
use steward_common_config::SecretString;

/// Signed cookies need a key of at least this many bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 64;

const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Key material for signing cookies. When absent a random key is
	/// generated at startup and sessions do not survive restarts.
	pub cookie_secret: Option<SecretString>,
	pub secure_cookies: bool,
	pub max_age_secs: i64,
}

impl Default for SessionConfig {
	fn default() -> Self {
		SessionConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfigLayer {
	#[serde(default)]
	pub cookie_secret: Option<SecretString>,
	#[serde(default)]
	pub secure_cookies: Option<bool>,
	#[serde(default)]
	pub max_age_secs: Option<i64>,
}

impl SessionConfigLayer {
	pub fn merge(&mut self, other: SessionConfigLayer) {
		if other.cookie_secret.is_some() {
			self.cookie_secret = other.cookie_secret;
		}
		if other.secure_cookies.is_some() {
			self.secure_cookies = other.secure_cookies;
		}
		if other.max_age_secs.is_some() {
			self.max_age_secs = other.max_age_secs;
		}
	}

	pub fn finalize(self) -> SessionConfig {
		SessionConfig {
			cookie_secret: self.cookie_secret,
			secure_cookies: self.secure_cookies.unwrap_or(false),
			max_age_secs: self.max_age_secs.unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS),
		}
	}
}
