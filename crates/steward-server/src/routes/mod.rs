// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod admin_logs;
pub mod admin_roles;
pub mod admin_settings;
pub mod admin_users;
pub mod auth;
pub mod health;
pub mod impersonation;
pub mod me;
pub mod site;

use axum::response::{IntoResponse, Response};
use steward_server_auth::{role_name_or, Profile, UserId, NO_ROLE};

use crate::api::AppState;
use crate::api_response::{forbidden, internal_error, AdminErrorResponse};

/// The caller's profile with its joined role.
pub(crate) async fn caller_profile(
	state: &AppState,
	user_id: &UserId,
) -> Result<Option<Profile>, Response> {
	state.profiles.get(user_id).await.map_err(|e| {
		tracing::error!(error = %e, user_id = %user_id, "Failed to load caller profile");
		internal_error::<AdminErrorResponse>("Failed to load user role").into_response()
	})
}

/// The caller's role name from their profile.
pub(crate) async fn caller_role(state: &AppState, user_id: &UserId) -> Result<Option<String>, Response> {
	Ok(caller_profile(state, user_id)
		.await?
		.and_then(|p| p.role.map(|r| r.name)))
}

/// Rejects callers whose role is not one of the configured admin roles.
pub(crate) async fn require_admin(state: &AppState, user_id: &UserId) -> Result<String, Response> {
	let role = caller_profile(state, user_id).await?.and_then(|p| p.role);
	if state.is_admin(role.as_ref()) {
		Ok(role_name_or(role.as_ref(), NO_ROLE).to_string())
	} else {
		tracing::warn!(
			actor_id = %user_id,
			role = role_name_or(role.as_ref(), NO_ROLE),
			"Admin role required"
		);
		Err(forbidden::<AdminErrorResponse>("forbidden", "Admin access required").into_response())
	}
}
