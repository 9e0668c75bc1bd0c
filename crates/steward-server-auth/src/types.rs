// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core identity types.
//!
//! - **ID newtypes**: [`UserId`], [`RoleId`], [`SettingId`] keep backend
//!   identifiers from being mixed up. The backend hands out UUID strings for
//!   users and integers for some tables, so IDs are stored as strings and
//!   deserialize from either.
//! - [`TokenPair`]: an access/refresh token pair where both halves are
//!   guaranteed non-empty.
//! - [`Session`]: a token pair plus the identity it belongs to.
//! - [`AuthUser`]: an account as reported by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use steward_common_secret::SecretString;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
	Text(String),
	Int(i64),
}

impl RawId {
	fn into_string(self) -> String {
		match self {
			RawId::Text(s) => s,
			RawId::Int(i) => i.to_string(),
		}
	}
}

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}

			pub fn into_inner(self) -> String {
				self.0
			}

			pub fn is_empty(&self) -> bool {
				self.0.trim().is_empty()
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<String> for $name {
			fn from(id: String) -> Self {
				Self(id)
			}
		}

		impl From<&str> for $name {
			fn from(id: &str) -> Self {
				Self(id.to_string())
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl<'de> Deserialize<'de> for $name {
			fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
			where
				D: Deserializer<'de>,
			{
				RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
			}
		}
	};
}

define_id_type!(UserId, "Identifier of an account in the identity provider.");
define_id_type!(RoleId, "Identifier of a row in the `roles` table.");
define_id_type!(SettingId, "Identifier of a row in the `settings` table.");

/// Access and refresh token, both non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
	access_token: SecretString,
	refresh_token: SecretString,
}

impl TokenPair {
	/// Builds a pair, or `None` if either token is empty.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
		let access_token = access_token.into();
		let refresh_token = refresh_token.into();
		if access_token.is_empty() || refresh_token.is_empty() {
			return None;
		}
		Some(Self {
			access_token: SecretString::new(access_token),
			refresh_token: SecretString::new(refresh_token),
		})
	}

	/// Builds a pair from optional halves. Partial pairs yield `None`.
	pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
		match (access_token, refresh_token) {
			(Some(access), Some(refresh)) => Self::new(access, refresh),
			_ => None,
		}
	}

	pub fn access_token(&self) -> &SecretString {
		&self.access_token
	}

	pub fn refresh_token(&self) -> &SecretString {
		&self.refresh_token
	}
}

/// An authenticated session: tokens plus the identity they were issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub tokens: TokenPair,
	pub user_id: UserId,
	pub user_email: Option<String>,
}

impl Session {
	pub fn new(tokens: TokenPair, user_id: UserId, user_email: Option<String>) -> Self {
		Self {
			tokens,
			user_id,
			user_email,
		}
	}
}

/// Account record from the identity provider's admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
	pub id: UserId,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub last_sign_in_at: Option<DateTime<Utc>>,
}
