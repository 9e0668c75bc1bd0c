// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Admin settings endpoints.
//!
//! - GET /api/admin/settings - settings the caller may view, with group headings
//! - PUT /api/admin/settings/{id} - update a value the caller may edit
//! - POST /api/admin/settings - create a setting (admin only)
//! - DELETE /api/admin/settings/{id} - delete a setting (admin only)

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use steward_server_audit::{AuditAction, AuditLogBuilder};
use steward_server_auth::{
	can_edit, can_view, format_group_key, group_settings, parse_default_value,
	parse_setting_value, sort_settings, validate_setting_value, Role, Setting, SettingId,
	SettingInputType,
};
use steward_server_db::{NewSetting, SettingUpdate};

use crate::api::AppState;
use crate::api_response::{
	conflict, forbidden, internal_error, not_found, AdminErrorResponse, ApiErrorResponse,
};
use crate::auth_middleware::RequireAuth;
use crate::client_info::ClientIp;
use crate::routes::{caller_role, require_admin};

const DEFAULT_SETTING_ROLES: &[&str] = &["admin"];

#[derive(Debug, Serialize)]
pub struct SettingGroup {
	pub key: String,
	pub label: String,
	pub settings: Vec<Setting>,
}

#[derive(Debug, Serialize)]
pub struct ListSettingsResponse {
	pub groups: Vec<SettingGroup>,
	pub roles: Vec<Role>,
	pub role: Option<String>,
}

/// A submitted value: form-style strings, or typed JSON used as-is.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
	One(String),
	Many(Vec<String>),
	Raw(Value),
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingBody {
	#[serde(default)]
	pub value: Option<SubmittedValue>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSettingBody {
	pub key: String,
	pub label: String,
	pub description: Option<String>,
	pub input_type: String,
	pub group_key: String,
	pub default_value: Option<String>,
	pub view_roles: Option<Vec<String>>,
	pub edit_roles: Option<Vec<String>>,
}

fn invalid_field(message: impl Into<String>, fields: &[&str]) -> Response {
	let body = AdminErrorResponse::new("bad_request", message)
		.with_fields(fields.iter().map(|f| f.to_string()).collect());
	(StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn store_failure(e: impl std::fmt::Display, message: &'static str) -> Response {
	tracing::error!(error = %e, "{message}");
	internal_error::<AdminErrorResponse>(message).into_response()
}

fn submitted_value(
	submitted: Option<SubmittedValue>,
	input_type: SettingInputType,
) -> Result<Value, Response> {
	let parsed = match submitted {
		None => parse_setting_value(&[], input_type),
		Some(SubmittedValue::One(raw)) => parse_setting_value(&[raw], input_type),
		Some(SubmittedValue::Many(raw)) => parse_setting_value(&raw, input_type),
		Some(SubmittedValue::Raw(value)) => Ok(value),
	};
	parsed.map_err(|e| invalid_field(e.to_string(), &["value"]))
}

fn role_list(roles: Option<Vec<String>>) -> Vec<String> {
	roles
		.map(|r| {
			r.into_iter()
				.map(|name| name.trim().to_string())
				.filter(|name| !name.is_empty())
				.collect::<Vec<_>>()
		})
		.filter(|r| !r.is_empty())
		.unwrap_or_else(|| DEFAULT_SETTING_ROLES.iter().map(|r| r.to_string()).collect())
}

/// GET /api/admin/settings
#[tracing::instrument(skip(state, current_user), fields(actor_id = %current_user.id()))]
pub async fn list_settings(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
) -> Response {
	let role = match caller_role(&state, current_user.id()).await {
		Ok(role) => role,
		Err(response) => return response,
	};
	let settings = match state.settings.list().await {
		Ok(settings) => settings,
		Err(e) => return store_failure(e, "Failed to list settings"),
	};
	let roles = match state.roles.list().await {
		Ok(roles) => roles,
		Err(e) => return store_failure(e, "Failed to list roles"),
	};

	let visible: Vec<Setting> = settings
		.into_iter()
		.filter(|s| !s.is_hidden && can_view(s, role.as_deref()))
		.collect();
	let groups = group_settings(visible)
		.into_iter()
		.map(|(key, mut settings)| {
			sort_settings(&mut settings);
			SettingGroup {
				label: format_group_key(&key),
				key,
				settings,
			}
		})
		.collect();

	Json(ListSettingsResponse {
		groups,
		roles,
		role,
	})
	.into_response()
}

/// PUT /api/admin/settings/{id}
#[tracing::instrument(
	skip(state, current_user, client_ip, body),
	fields(actor_id = %current_user.id(), setting_id = %id)
)]
pub async fn update_setting(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Path(id): Path<String>,
	Json(body): Json<UpdateSettingBody>,
) -> Response {
	let id = SettingId::new(id);
	let setting = match state.settings.get(&id).await {
		Ok(Some(setting)) => setting,
		Ok(None) => return not_found::<AdminErrorResponse>("Setting not found").into_response(),
		Err(e) => return store_failure(e, "Failed to load setting"),
	};

	let role = match caller_role(&state, current_user.id()).await {
		Ok(role) => role,
		Err(response) => return response,
	};
	if setting.is_readonly || !can_edit(&setting, role.as_deref()) {
		tracing::warn!(key = %setting.key, role = ?role, "Setting edit denied");
		return forbidden::<AdminErrorResponse>(
			"forbidden",
			"You do not have permission to edit this setting",
		)
		.into_response();
	}

	let value = match submitted_value(body.value, setting.input_type) {
		Ok(value) => value,
		Err(response) => return response,
	};
	if let Some(rules) = &setting.validation {
		if let Err(message) = validate_setting_value(&value, rules) {
			return invalid_field(message, &["value"]);
		}
	}

	let update = SettingUpdate {
		value: value.clone(),
		updated_at: Utc::now(),
		updated_by: current_user.id().clone(),
		label: body
			.label
			.map(|l| l.trim().to_string())
			.filter(|l| !l.is_empty()),
		description: body
			.description
			.map(|d| Some(d.trim().to_string()).filter(|d| !d.is_empty())),
	};
	let updated = match state.settings.update(&id, &update).await {
		Ok(Some(updated)) => updated,
		Ok(None) => return not_found::<AdminErrorResponse>("Setting not found").into_response(),
		Err(e) => return store_failure(e, "Failed to update setting"),
	};

	let entry = AuditLogBuilder::new(AuditAction::UpdateSetting)
		.actor(current_user.id().clone())
		.entity(id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({
			"key": setting.key,
			"old_value": setting.value,
			"new_value": value,
		}))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record update_setting audit entry");
	}

	Json(updated).into_response()
}

/// POST /api/admin/settings
#[tracing::instrument(
	skip(state, current_user, client_ip, body),
	fields(actor_id = %current_user.id(), key = %body.key)
)]
pub async fn create_setting(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Json(body): Json<CreateSettingBody>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let key = body.key.trim().to_string();
	let label = body.label.trim().to_string();
	let input_type = body.input_type.trim().to_string();
	let group_key = body.group_key.trim().to_string();
	let missing: Vec<&str> = [
		("key", &key),
		("label", &label),
		("input_type", &input_type),
		("group_key", &group_key),
	]
	.into_iter()
	.filter(|(_, v)| v.is_empty())
	.map(|(name, _)| name)
	.collect();
	if !missing.is_empty() {
		return invalid_field("Missing required fields", &missing);
	}

	match state.settings.key_exists(&key).await {
		Ok(false) => {}
		Ok(true) => {
			return conflict::<AdminErrorResponse>(
				"conflict",
				"A setting with this key already exists",
			)
			.into_response()
		}
		Err(e) => return store_failure(e, "Failed to check setting key"),
	}

	let input_type = SettingInputType::parse(&input_type);
	let default_value =
		match parse_default_value(body.default_value.as_deref().unwrap_or(""), input_type) {
			Ok(value) => value,
			Err(e) => return invalid_field(e.to_string(), &["default_value"]),
		};

	let new_setting = NewSetting {
		key: key.clone(),
		label,
		description: body
			.description
			.map(|d| d.trim().to_string())
			.filter(|d| !d.is_empty()),
		input_type,
		group_key,
		value: default_value.clone(),
		default_value,
		view_roles: role_list(body.view_roles),
		edit_roles: role_list(body.edit_roles),
		updated_by: current_user.id().clone(),
	};
	let created = match state.settings.create(&new_setting).await {
		Ok(created) => created,
		Err(e) => return store_failure(e, "Failed to create setting"),
	};

	let entry = AuditLogBuilder::new(AuditAction::CreateSetting)
		.actor(current_user.id().clone())
		.entity(created.id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({ "key": key, "input_type": input_type.as_str() }))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record create_setting audit entry");
	}

	(StatusCode::CREATED, Json(created)).into_response()
}

/// DELETE /api/admin/settings/{id}
#[tracing::instrument(
	skip(state, current_user, client_ip),
	fields(actor_id = %current_user.id(), setting_id = %id)
)]
pub async fn delete_setting(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	client_ip: ClientIp,
	Path(id): Path<String>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let id = SettingId::new(id);
	let setting = match state.settings.get(&id).await {
		Ok(Some(setting)) => setting,
		Ok(None) => return not_found::<AdminErrorResponse>("Setting not found").into_response(),
		Err(e) => return store_failure(e, "Failed to load setting"),
	};
	match state.settings.delete(&id).await {
		Ok(true) => {}
		Ok(false) => return not_found::<AdminErrorResponse>("Setting not found").into_response(),
		Err(e) => return store_failure(e, "Failed to delete setting"),
	}

	let entry = AuditLogBuilder::new(AuditAction::DeleteSetting)
		.actor(current_user.id().clone())
		.entity(id.as_str())
		.ip_address_opt(client_ip.0)
		.metadata(json!({ "key": setting.key }))
		.build();
	if let Err(e) = state.audit_service.record(entry).await {
		tracing::warn!(error = %e, "Failed to record delete_setting audit entry");
	}

	StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn form_strings_are_parsed_by_input_type() {
		let value = submitted_value(
			Some(SubmittedValue::One("42".to_string())),
			SettingInputType::Number,
		)
		.unwrap();
		assert_eq!(value, json!(42));

		let value = submitted_value(None, SettingInputType::Boolean).unwrap();
		assert_eq!(value, json!(false));

		let value = submitted_value(
			Some(SubmittedValue::Many(vec!["a".to_string(), "b".to_string()])),
			SettingInputType::Multiselect,
		)
		.unwrap();
		assert_eq!(value, json!(["a", "b"]));
	}

	#[test]
	fn typed_json_is_kept() {
		let body: UpdateSettingBody = serde_json::from_str(r#"{"value": true}"#).unwrap();
		let value = submitted_value(body.value, SettingInputType::Boolean).unwrap();
		assert_eq!(value, json!(true));
	}

	#[test]
	fn bad_number_is_rejected() {
		let err = submitted_value(
			Some(SubmittedValue::One("abc".to_string())),
			SettingInputType::Number,
		)
		.unwrap_err();
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn roles_default_to_admin() {
		assert_eq!(role_list(None), vec!["admin"]);
		assert_eq!(role_list(Some(vec![" ".to_string()])), vec!["admin"]);
		assert_eq!(
			role_list(Some(vec!["editor".to_string(), "admin".to_string()])),
			vec!["editor", "admin"]
		);
	}
}
