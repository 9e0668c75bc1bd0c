// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rows of the backend's `roles`, `profiles` and `settings` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::settings::SettingInputType;
use crate::types::{RoleId, SettingId, UserId};

/// `null` columns deserialize to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
	pub id: RoleId,
	pub name: String,
	#[serde(default)]
	pub colour: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

/// Role columns embedded in a profile row via `roles(name, colour)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
	pub name: String,
	#[serde(default)]
	pub colour: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	pub id: UserId,
	#[serde(default)]
	pub full_name: Option<String>,
	#[serde(default)]
	pub company_name: Option<String>,
	#[serde(default)]
	pub website: Option<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub unsubscribed: bool,
	#[serde(default)]
	pub role_id: Option<RoleId>,
	#[serde(default, rename = "roles", skip_serializing_if = "Option::is_none")]
	pub role: Option<RoleSummary>,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
	pub fn role_name(&self) -> Option<&str> {
		self.role.as_ref().map(|r| r.name.as_str())
	}
}

/// Optional constraints on a setting's value, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
	#[serde(default)]
	pub required: bool,
	#[serde(default)]
	pub min: Option<f64>,
	#[serde(default)]
	pub max: Option<f64>,
	#[serde(default)]
	pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
	pub id: SettingId,
	pub key: String,
	pub label: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub value: serde_json::Value,
	#[serde(default)]
	pub default_value: serde_json::Value,
	#[serde(default)]
	pub input_type: SettingInputType,
	#[serde(default)]
	pub group_key: Option<String>,
	#[serde(default)]
	pub sort_order: Option<i32>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub view_roles: Vec<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub edit_roles: Vec<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub is_hidden: bool,
	#[serde(default, deserialize_with = "null_as_default")]
	pub is_readonly: bool,
	#[serde(default)]
	pub validation: Option<ValidationRules>,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub updated_by: Option<UserId>,
}

impl Setting {
	/// The stored value, or the default when no value has been saved.
	pub fn effective_value(&self) -> &serde_json::Value {
		if self.value.is_null() {
			&self.default_value
		} else {
			&self.value
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn profile_with_joined_role() {
		let profile: Profile = serde_json::from_str(
			r##"{
				"id": "u1",
				"full_name": "Ada",
				"company_name": null,
				"unsubscribed": null,
				"role_id": 2,
				"roles": {"name": "admin", "colour": "#FF0000"}
			}"##,
		)
		.unwrap();
		assert_eq!(profile.role_name(), Some("admin"));
		assert_eq!(profile.role_id, Some(RoleId::new("2")));
		assert!(!profile.unsubscribed);
	}

	#[test]
	fn setting_with_null_arrays() {
		let setting: Setting = serde_json::from_str(
			r#"{
				"id": 1,
				"key": "site_title",
				"label": "Site title",
				"value": null,
				"default_value": "App",
				"input_type": "text",
				"view_roles": null,
				"edit_roles": ["admin"],
				"is_hidden": false,
				"is_readonly": null,
				"validation": {"required": true}
			}"#,
		)
		.unwrap();
		assert!(setting.view_roles.is_empty());
		assert_eq!(setting.edit_roles, vec!["admin".to_string()]);
		assert!(!setting.is_readonly);
		assert_eq!(setting.effective_value(), &serde_json::json!("App"));
		assert!(setting.validation.unwrap().required);
	}

	#[test]
	fn unknown_input_type_is_text() {
		let setting: Setting = serde_json::from_str(
			r#"{"id": "s", "key": "k", "label": "l", "input_type": "slider"}"#,
		)
		.unwrap();
		assert_eq!(setting.input_type, SettingInputType::Text);
	}
}
