// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Impersonation HTTP handlers.
//!
//! - POST /app/users/{id}/impersonate - stash the admin session and sign in as the user
//! - POST /app/impersonation/stop - restore the stashed admin session
//! - GET /app/impersonation - whether a stashed session exists
//!
//! Starting requires one of the configured admin roles. Stopping only needs
//! the stash, since the impersonated session may already have expired.

use axum::{
	extract::{Path, State},
	response::{IntoResponse, Redirect, Response},
	Json,
};
use steward_server_auth::UserId;
use steward_server_impersonation::ImpersonationState;
use tower_cookies::Cookies;

use crate::api::AppState;
use crate::api_response::impersonation_error;
use crate::auth_middleware::OptionalAuth;
use crate::client_info::ClientIp;
use crate::cookies;
use crate::routes::require_admin;

#[tracing::instrument(
	skip(state, current_user, cookies, client_ip),
	fields(actor_id = current_user.as_ref().map(|u| u.id().as_str()), target_id = %user_id)
)]
pub async fn start_impersonation(
	State(state): State<AppState>,
	OptionalAuth(current_user): OptionalAuth,
	cookies: Cookies,
	client_ip: ClientIp,
	Path(user_id): Path<String>,
) -> Response {
	if let Some(user) = &current_user {
		if let Err(response) = require_admin(&state, user.id()).await {
			return response;
		}
	}

	let stash = state.stash(cookies);
	let admin = current_user.as_ref().map(|u| &u.session);
	match state
		.impersonation
		.start(admin, &UserId::new(user_id), &stash, client_ip.as_deref())
		.await
	{
		Ok(redirect) => Redirect::to(redirect.location()).into_response(),
		Err(e) => {
			tracing::warn!(error = %e, stage = %e.stage, "Impersonation start failed");
			impersonation_error(&e)
		}
	}
}

#[tracing::instrument(skip(state, current_user, cookies, client_ip))]
pub async fn stop_impersonation(
	State(state): State<AppState>,
	OptionalAuth(current_user): OptionalAuth,
	cookies: Cookies,
	client_ip: ClientIp,
) -> Response {
	let stash = state.stash(cookies.clone());
	let impersonated = current_user.as_ref().map(|u| u.id());
	match state
		.impersonation
		.stop(&stash, impersonated, client_ip.as_deref())
		.await
	{
		Ok(stopped) => {
			cookies::write_session(
				&cookies,
				&state.cookie_key,
				&state.session_config,
				&stopped.session.tokens,
			);
			Redirect::to(stopped.redirect.location()).into_response()
		}
		Err(e) => {
			tracing::warn!(error = %e, stage = %e.stage, "Impersonation stop failed");
			impersonation_error(&e)
		}
	}
}

pub async fn impersonation_state(
	State(state): State<AppState>,
	cookies: Cookies,
) -> Json<ImpersonationState> {
	let stash = state.stash(cookies);
	Json(state.impersonation.state(&stash).await)
}
