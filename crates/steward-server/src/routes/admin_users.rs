// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Admin user management.
//!
//! - GET /api/admin/users - accounts merged with their profiles
//! - POST /api/admin/users - create an account and its profile
//! - PUT /api/admin/users/{id} - update email and profile fields
//!
//! Creating and updating require an admin role.

use std::collections::HashMap;

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use steward_server_audit::{AuditAction, AuditLogBuilder};
use steward_server_auth::{
	validate_user_create, validate_user_update, AuthUser, Profile, UserId,
};
use steward_server_gotrue::{CreateUserRequest, ProviderError};

use crate::api::AppState;
use crate::api_response::{
	bad_request, internal_error, not_found, validation_error, AdminErrorResponse,
};
use crate::auth_middleware::RequireAuth;
use crate::client_info::ClientIp;
use crate::pagination::PageParams;
use crate::routes::require_admin;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 1000;

#[derive(Debug, Serialize)]
pub struct AdminUser {
	pub id: UserId,
	pub email: Option<String>,
	pub created_at: Option<DateTime<Utc>>,
	pub last_sign_in_at: Option<DateTime<Utc>>,
	pub full_name: Option<String>,
	pub company_name: Option<String>,
	pub role_name: Option<String>,
	pub role_colour: Option<String>,
}

impl AdminUser {
	fn merge(user: AuthUser, profile: Option<&Profile>) -> Self {
		let role = profile.and_then(|p| p.role.as_ref());
		Self {
			id: user.id,
			email: user.email,
			created_at: user.created_at,
			last_sign_in_at: user.last_sign_in_at,
			full_name: profile.and_then(|p| p.full_name.clone()),
			company_name: profile.and_then(|p| p.company_name.clone()),
			role_name: role.map(|r| r.name.clone()),
			role_colour: role.and_then(|r| r.colour.clone()),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
	pub users: Vec<AdminUser>,
	pub current_user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub password: String,
	#[serde(default)]
	pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub full_name: String,
	#[serde(default)]
	pub company_name: Option<String>,
}

fn provider_failure(e: ProviderError, action: &str) -> Response {
	match e {
		ProviderError::Rejected { status, message } if (400..500).contains(&status) => {
			bad_request::<AdminErrorResponse>("bad_request", message).into_response()
		}
		e => {
			tracing::error!(error = %e, "Failed to {action}");
			internal_error::<AdminErrorResponse>(format!("Failed to {action}")).into_response()
		}
	}
}

/// GET /api/admin/users
#[tracing::instrument(skip(state, current_user, params), fields(actor_id = %current_user.id()))]
pub async fn list_users(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	Query(params): Query<PageParams>,
) -> Response {
	let users = match state
		.provider
		.list_users(
			params.page_or_default(),
			params.per_page_clamped(DEFAULT_PER_PAGE, MAX_PER_PAGE),
		)
		.await
	{
		Ok(users) => users,
		Err(e) => return provider_failure(e, "list users"),
	};

	let profiles = match state.profiles.list().await {
		Ok(profiles) => profiles,
		Err(e) => {
			tracing::error!(error = %e, "Failed to list profiles");
			return internal_error::<AdminErrorResponse>("Failed to list users").into_response();
		}
	};
	let by_id: HashMap<&UserId, &Profile> = profiles.iter().map(|p| (&p.id, p)).collect();

	let users = users
		.into_iter()
		.map(|user| {
			let profile = by_id.get(&user.id).copied();
			AdminUser::merge(user, profile)
		})
		.collect();

	Json(ListUsersResponse {
		users,
		current_user_id: current_user.id().clone(),
	})
	.into_response()
}

/// POST /api/admin/users
#[tracing::instrument(skip(state, current_user, client_ip, body), fields(actor_id = %current_user.id()))]
pub async fn create_user(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Json(body): Json<CreateUserBody>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let email = body.email.trim().to_string();
	let full_name = body.full_name.trim().to_string();
	let validation = validate_user_create(&email, &body.password, &full_name);
	if !validation.valid {
		return validation_error(validation);
	}

	let request = CreateUserRequest {
		email: email.clone(),
		password: body.password.into(),
		email_confirm: true,
	};
	let user = match state.provider.create_user(&request).await {
		Ok(user) => user,
		Err(e) => return provider_failure(e, "create user"),
	};

	if let Err(e) = state.profiles.create(&user.id, &full_name).await {
		tracing::warn!(error = %e, user_id = %user.id, "Failed to create profile for new user");
	}

	let entry = AuditLogBuilder::new(AuditAction::CreateUser)
		.actor(current_user.id().clone())
		.entity(user.id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({ "email": email, "full_name": full_name }))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record create_user audit entry");
	}

	tracing::info!(target_id = %user.id, "User created");
	(StatusCode::CREATED, Json(AdminUser::merge(user, None))).into_response()
}

/// PUT /api/admin/users/{id}
#[tracing::instrument(
	skip(state, current_user, client_ip, body),
	fields(actor_id = %current_user.id(), target_id = %id)
)]
pub async fn update_user(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Path(id): Path<String>,
	Json(body): Json<UpdateUserBody>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let email = body.email.trim().to_string();
	let full_name = body.full_name.trim().to_string();
	let validation = validate_user_update(&email, &full_name);
	if !validation.valid {
		return validation_error(validation);
	}

	let id = UserId::new(id);
	let existing = match state.provider.get_user_by_id(&id).await {
		Ok(Some(user)) => user,
		Ok(None) => return not_found::<AdminErrorResponse>("User not found").into_response(),
		Err(e) => return provider_failure(e, "load user"),
	};

	let email_changed = existing.email.as_deref() != Some(email.as_str());
	if email_changed {
		if let Err(e) = state.provider.update_user_email(&id, &email).await {
			return provider_failure(e, "update email");
		}
	}

	let company_name = body.company_name.as_deref().map(str::trim);
	match state.profiles.update(&id, &full_name, company_name).await {
		Ok(true) => {}
		Ok(false) => {
			if let Err(e) = state.profiles.create(&id, &full_name).await {
				tracing::warn!(error = %e, "Failed to create missing profile");
			}
		}
		Err(e) => {
			tracing::error!(error = %e, "Failed to update profile");
			return internal_error::<AdminErrorResponse>("Failed to update profile").into_response();
		}
	}

	let entry = AuditLogBuilder::new(AuditAction::UpdateUser)
		.actor(current_user.id().clone())
		.entity(id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({
			"email": email,
			"full_name": full_name,
			"email_changed": email_changed,
		}))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record update_user audit entry");
	}

	Json(json!({ "success": true })).into_response()
}
