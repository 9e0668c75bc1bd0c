// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GET /api/me - the signed-in account with its profile and role.
//!
//! Page layouts use `has_full_profile` to send users with an incomplete
//! profile to the profile form, and `is_admin` to show admin navigation.

use axum::{extract::State, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use steward_server_auth::{
	has_full_profile, role_name_or, Profile, ProfileRequirement, UserId, NO_ROLE,
};

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::routes::caller_profile;

#[derive(Debug, Serialize)]
pub struct MeResponse {
	pub id: UserId,
	pub email: Option<String>,
	pub profile: Option<Profile>,
	pub role_name: String,
	pub is_admin: bool,
	pub has_full_profile: bool,
}

#[tracing::instrument(skip(state, current_user), fields(actor_id = %current_user.id()))]
pub async fn get_me(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
) -> Response {
	let profile = match caller_profile(&state, current_user.id()).await {
		Ok(profile) => profile,
		Err(response) => return response,
	};
	let role = profile.as_ref().and_then(|p| p.role.as_ref());

	Json(MeResponse {
		id: current_user.user.id.clone(),
		email: current_user.user.email.clone(),
		role_name: role_name_or(role, NO_ROLE).to_string(),
		is_admin: state.is_admin(role),
		has_full_profile: has_full_profile(profile.as_ref(), ProfileRequirement::Basic),
		profile,
	})
	.into_response()
}
