// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Request and response types for the identity provider.

use serde::{Deserialize, Serialize};
use steward_common_secret::SecretString;

/// Kind of authentication link / one-time password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
	Magiclink,
	Recovery,
	Invite,
	Signup,
}

impl LinkType {
	pub fn as_str(&self) -> &'static str {
		match self {
			LinkType::Magiclink => "magiclink",
			LinkType::Recovery => "recovery",
			LinkType::Invite => "invite",
			LinkType::Signup => "signup",
		}
	}
}

/// Result of `generate_link`: the action URL plus the hashed OTP, when the
/// provider exposes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLink {
	pub action_link: String,
	pub hashed_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
	pub email: String,
	pub password: SecretString,
	pub email_confirm: bool,
}
