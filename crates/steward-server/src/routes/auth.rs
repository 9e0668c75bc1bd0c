// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Sign-in callback.
//!
//! Accepts either a token pair (the impersonation hand-off and implicit
//! flow links) or a PKCE code, establishes the session cookie and sends the
//! browser on to `next`.

use axum::{
	extract::{Query, State},
	response::Redirect,
};
use serde::Deserialize;
use steward_server_auth::TokenPair;
use tower_cookies::Cookies;

use crate::api::AppState;
use crate::cookies;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
	pub access_token: Option<String>,
	pub refresh_token: Option<String>,
	pub code: Option<String>,
	pub next: Option<String>,
}

/// `next` when it is a same-origin path, otherwise `default`.
pub fn safe_next<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
	match next {
		Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
			path
		}
		_ => default,
	}
}

/// GET {callback_path} - Establish the session and redirect.
#[tracing::instrument(skip(state, cookies, params), fields(has_code = params.code.is_some()))]
pub async fn callback(
	State(state): State<AppState>,
	cookies: Cookies,
	Query(params): Query<CallbackParams>,
) -> Redirect {
	let config = &state.impersonation_config;
	let sign_in = Redirect::to(&config.sign_in_path);

	let result = if let Some(tokens) =
		TokenPair::from_parts(params.access_token.clone(), params.refresh_token.clone())
	{
		state.provider.set_session(&tokens).await
	} else if let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) {
		let Some(verifier) =
			cookies::take_code_verifier(&cookies, &state.cookie_key, &state.session_config)
		else {
			tracing::warn!("Sign-in callback has a code but no verifier");
			return sign_in;
		};
		state.provider.exchange_code_for_session(code, &verifier).await
	} else {
		tracing::debug!("Sign-in callback without credentials");
		return sign_in;
	};

	match result {
		Ok(session) => {
			cookies::write_session(&cookies, &state.cookie_key, &state.session_config, &session.tokens);
			tracing::info!(user_id = %session.user_id, "Session established");
			Redirect::to(safe_next(params.next.as_deref(), &config.default_next_path))
		}
		Err(e) => {
			tracing::warn!(error = %e, "Sign-in callback failed");
			sign_in
		}
	}
}
