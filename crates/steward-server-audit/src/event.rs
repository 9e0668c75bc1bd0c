// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steward_server_auth::UserId;

/// Actions that leave an entry in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
	ImpersonateUser,
	StopImpersonation,
	CreateUser,
	UpdateUser,
	CreateSetting,
	UpdateSetting,
	DeleteSetting,
	UpdateRoleColour,
}

impl AuditAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditAction::ImpersonateUser => "impersonate_user",
			AuditAction::StopImpersonation => "stop_impersonation",
			AuditAction::CreateUser => "create_user",
			AuditAction::UpdateUser => "update_user",
			AuditAction::CreateSetting => "create_setting",
			AuditAction::UpdateSetting => "update_setting",
			AuditAction::DeleteSetting => "delete_setting",
			AuditAction::UpdateRoleColour => "update_role_colour",
		}
	}

	/// Entity type recorded alongside the action.
	pub fn entity_type(&self) -> &'static str {
		match self {
			AuditAction::ImpersonateUser
			| AuditAction::StopImpersonation
			| AuditAction::CreateUser
			| AuditAction::UpdateUser => "user",
			AuditAction::CreateSetting | AuditAction::UpdateSetting | AuditAction::DeleteSetting => {
				"setting"
			}
			AuditAction::UpdateRoleColour => "role",
		}
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
	pub timestamp: DateTime<Utc>,
	pub action: AuditAction,
	/// The user who performed the action.
	pub actor_user_id: Option<UserId>,
	pub entity_type: String,
	pub entity_id: Option<String>,
	pub ip_address: Option<String>,
	pub metadata: serde_json::Value,
}

impl AuditLogEntry {
	pub fn builder(action: AuditAction) -> AuditLogBuilder {
		AuditLogBuilder::new(action)
	}
}

pub struct AuditLogBuilder {
	action: AuditAction,
	actor_user_id: Option<UserId>,
	entity_type: Option<String>,
	entity_id: Option<String>,
	ip_address: Option<String>,
	metadata: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(action: AuditAction) -> Self {
		Self {
			action,
			actor_user_id: None,
			entity_type: None,
			entity_id: None,
			ip_address: None,
			metadata: serde_json::Value::Null,
		}
	}

	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	/// Entity ID affected by the action. The entity type defaults to the
	/// action's own; see [`AuditLogBuilder::entity_type`] to override it.
	pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
		self.entity_id = Some(entity_id.into());
		self
	}

	pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
		self.entity_type = Some(entity_type.into());
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn ip_address_opt(mut self, ip: Option<String>) -> Self {
		self.ip_address = ip;
		self
	}

	pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
		self.metadata = metadata;
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			timestamp: Utc::now(),
			entity_type: self
				.entity_type
				.unwrap_or_else(|| self.action.entity_type().to_string()),
			action: self.action,
			actor_user_id: self.actor_user_id,
			entity_id: self.entity_id,
			ip_address: self.ip_address,
			metadata: self.metadata,
		}
	}
}
