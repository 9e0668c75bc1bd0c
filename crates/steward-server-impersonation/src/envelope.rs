// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stashed session envelope.
//!
//! JSON object with `access_token`, `refresh_token`, `user_id` and
//! `user_email` (nullable). Tokens are exposed only while building the
//! envelope string.

use serde::Deserialize;
use serde_json::json;
use steward_server_auth::{Session, TokenPair, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	#[error("malformed session envelope: {0}")]
	Malformed(String),
}

#[derive(Deserialize)]
struct RawEnvelope {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	user_id: Option<String>,
	#[serde(default)]
	user_email: Option<String>,
}

pub fn encode(session: &Session) -> String {
	json!({
		"access_token": session.tokens.access_token().expose(),
		"refresh_token": session.tokens.refresh_token().expose(),
		"user_id": session.user_id.as_str(),
		"user_email": session.user_email,
	})
	.to_string()
}

pub fn decode(envelope: &str) -> Result<Session, DecodeError> {
	let raw: RawEnvelope =
		serde_json::from_str(envelope).map_err(|e| DecodeError::Malformed(e.to_string()))?;

	let tokens = TokenPair::from_parts(raw.access_token, raw.refresh_token)
		.ok_or_else(|| DecodeError::Malformed("missing token".to_string()))?;
	let user_id = raw
		.user_id
		.map(UserId::new)
		.filter(|id| !id.is_empty())
		.ok_or_else(|| DecodeError::Malformed("missing user_id".to_string()))?;

	Ok(Session::new(tokens, user_id, raw.user_email))
}
