// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use steward_server_audit::{AuditAction, AuditLogBuilder};
use steward_server_auth::{Role, RoleId};
use steward_server_db::is_hex_colour;

use crate::api::AppState;
use crate::api_response::{internal_error, not_found, AdminErrorResponse, ApiErrorResponse};
use crate::auth_middleware::RequireAuth;
use crate::client_info::ClientIp;
use crate::routes::require_admin;

#[derive(Debug, Serialize)]
pub struct ListRolesResponse {
	pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateColourBody {
	#[serde(default)]
	pub colour: String,
}

/// GET /api/admin/roles - Roles ordered by name.
#[tracing::instrument(skip(state, current_user), fields(actor_id = %current_user.id()))]
pub async fn list_roles(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
) -> Response {
	match state.roles.list().await {
		Ok(roles) => Json(ListRolesResponse { roles }).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "Failed to list roles");
			internal_error::<AdminErrorResponse>("Failed to list roles").into_response()
		}
	}
}

/// PUT /api/admin/roles/{id}/colour
#[tracing::instrument(
	skip(state, current_user, client_ip, body),
	fields(actor_id = %current_user.id(), role_id = %id)
)]
pub async fn update_role_colour(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Path(id): Path<String>,
	Json(body): Json<UpdateColourBody>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let colour = body.colour.trim();
	if !is_hex_colour(colour) {
		let body = AdminErrorResponse::new("bad_request", "Colour must be a hex value like #1A2B3C")
			.with_fields(vec!["colour".to_string()]);
		return (StatusCode::BAD_REQUEST, Json(body)).into_response();
	}

	let role = match state.roles.update_colour(&RoleId::new(id), colour).await {
		Ok(Some(role)) => role,
		Ok(None) => return not_found::<AdminErrorResponse>("Role not found").into_response(),
		Err(e) => {
			tracing::error!(error = %e, "Failed to update role colour");
			return internal_error::<AdminErrorResponse>("Failed to update role").into_response();
		}
	};

	let entry = AuditLogBuilder::new(AuditAction::UpdateRoleColour)
		.actor(current_user.id().clone())
		.entity(role.id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({ "role_name": role.name, "colour": colour }))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record role colour audit entry");
	}

	Json(role).into_response()
}
