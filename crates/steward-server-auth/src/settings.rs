// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Setting value handling.
//!
//! Settings arrive from forms as raw strings and are stored as JSON. The
//! `input_type` column decides how a raw value is parsed, and the optional
//! `validation` column constrains what may be saved.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::records::{Setting, ValidationRules};

/// Group used for settings without a `group_key`.
pub const DEFAULT_GROUP: &str = "general";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SettingInputType {
	#[default]
	Text,
	Number,
	Boolean,
	Date,
	Color,
	Textarea,
	Select,
	Multiselect,
	Json,
}

impl SettingInputType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Number => "number",
			Self::Boolean => "boolean",
			Self::Date => "date",
			Self::Color => "color",
			Self::Textarea => "textarea",
			Self::Select => "select",
			Self::Multiselect => "multiselect",
			Self::Json => "json",
		}
	}

	/// Parses a stored input type. Unknown names fall back to text.
	pub fn parse(s: &str) -> Self {
		match s {
			"number" => Self::Number,
			"boolean" => Self::Boolean,
			"date" => Self::Date,
			"color" => Self::Color,
			"textarea" => Self::Textarea,
			"select" => Self::Select,
			"multiselect" => Self::Multiselect,
			"json" => Self::Json,
			_ => Self::Text,
		}
	}
}

impl From<String> for SettingInputType {
	fn from(s: String) -> Self {
		Self::parse(&s)
	}
}

impl From<SettingInputType> for String {
	fn from(t: SettingInputType) -> Self {
		t.as_str().to_string()
	}
}

impl fmt::Display for SettingInputType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingValueError {
	#[error("'{0}' is not a number")]
	InvalidNumber(String),

	#[error("invalid JSON: {0}")]
	InvalidJson(String),
}

fn parse_number(raw: &str) -> Result<Value, SettingValueError> {
	let trimmed = raw.trim();
	if let Ok(i) = trimmed.parse::<i64>() {
		return Ok(Value::from(i));
	}
	trimmed
		.parse::<f64>()
		.ok()
		.and_then(serde_json::Number::from_f64)
		.map(Value::Number)
		.ok_or_else(|| SettingValueError::InvalidNumber(raw.to_string()))
}

fn parse_json(raw: &str) -> Result<Value, SettingValueError> {
	serde_json::from_str(raw).map_err(|e| SettingValueError::InvalidJson(e.to_string()))
}

/// Converts submitted form values into the JSON stored for a setting.
///
/// `values` holds every submitted value for the field; only multiselect
/// looks past the first.
pub fn parse_setting_value(
	values: &[String],
	input_type: SettingInputType,
) -> Result<Value, SettingValueError> {
	let raw = values.first().map(String::as_str).unwrap_or("");

	match input_type {
		SettingInputType::Number if raw.is_empty() => Ok(Value::Null),
		SettingInputType::Number => parse_number(raw),
		SettingInputType::Boolean => Ok(Value::Bool(raw == "on" || raw == "true")),
		SettingInputType::Json if raw.is_empty() => Ok(Value::Null),
		SettingInputType::Json => parse_json(raw),
		SettingInputType::Multiselect if values.is_empty() => Ok(Value::Null),
		SettingInputType::Multiselect => Ok(Value::Array(
			values.iter().cloned().map(Value::String).collect(),
		)),
		_ if raw.is_empty() => Ok(Value::Null),
		_ => Ok(Value::String(raw.to_string())),
	}
}

/// Converts the default value given when a setting is created.
///
/// Unlike form updates, only the literal `true` enables a boolean and
/// multiselect defaults are kept as a plain string.
pub fn parse_default_value(
	raw: &str,
	input_type: SettingInputType,
) -> Result<Value, SettingValueError> {
	match input_type {
		SettingInputType::Number if raw.is_empty() => Ok(Value::Null),
		SettingInputType::Number => parse_number(raw),
		SettingInputType::Boolean => Ok(Value::Bool(raw == "true")),
		SettingInputType::Json if raw.is_empty() => Ok(Value::Null),
		SettingInputType::Json => parse_json(raw),
		_ if raw.is_empty() => Ok(Value::Null),
		_ => Ok(Value::String(raw.to_string())),
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

/// Checks a parsed value against a setting's validation rules.
///
/// `min`/`max` only apply to values that read as numbers; `pattern` only
/// applies to strings.
pub fn validate_setting_value(value: &Value, rules: &ValidationRules) -> Result<(), String> {
	if rules.required && !is_truthy(value) {
		return Err("This setting is required".to_string());
	}

	let number = as_number(value);
	if let (Some(min), Some(n)) = (rules.min, number) {
		if n < min {
			return Err(format!("Value must be at least {min}"));
		}
	}
	if let (Some(max), Some(n)) = (rules.max, number) {
		if n > max {
			return Err(format!("Value must be at most {max}"));
		}
	}

	if let (Some(pattern), Value::String(s)) = (&rules.pattern, value) {
		// An unusable pattern can never be satisfied.
		let matches = regex::Regex::new(pattern)
			.map(|re| re.is_match(s))
			.unwrap_or(false);
		if !matches {
			return Err("Value does not match the required pattern".to_string());
		}
	}

	Ok(())
}

/// Human-readable rendering of a stored value.
pub fn format_setting_value(value: &Value, input_type: SettingInputType) -> String {
	match (value, input_type) {
		(Value::Null, _) => String::new(),
		(v, SettingInputType::Boolean) => {
			if is_truthy(v) {
				"Yes".to_string()
			} else {
				"No".to_string()
			}
		}
		(v, SettingInputType::Json | SettingInputType::Multiselect) => {
			serde_json::to_string_pretty(v).unwrap_or_default()
		}
		(Value::String(s), _) => s.clone(),
		(v, _) => v.to_string(),
	}
}

/// `site_config` -> `Site Config`
pub fn format_group_key(group_key: &str) -> String {
	group_key
		.split('_')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

/// Groups settings by `group_key`, keeping groups in first-seen order.
pub fn group_settings(settings: Vec<Setting>) -> Vec<(String, Vec<Setting>)> {
	let mut groups: Vec<(String, Vec<Setting>)> = Vec::new();
	for setting in settings {
		let key = setting
			.group_key
			.clone()
			.filter(|k| !k.is_empty())
			.unwrap_or_else(|| DEFAULT_GROUP.to_string());
		match groups.iter_mut().find(|(k, _)| *k == key) {
			Some((_, members)) => members.push(setting),
			None => groups.push((key, vec![setting])),
		}
	}
	groups
}

/// Stable sort by `sort_order`; a missing order counts as 0.
pub fn sort_settings(settings: &mut [Setting]) {
	settings.sort_by_key(|s| s.sort_order.unwrap_or(0));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::SettingId;
	use serde_json::json;

	fn values(v: &[&str]) -> Vec<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	fn setting(id: &str, group: Option<&str>, order: Option<i32>) -> Setting {
		Setting {
			id: SettingId::new(id),
			key: id.to_string(),
			label: id.to_string(),
			description: None,
			value: Value::Null,
			default_value: Value::Null,
			input_type: SettingInputType::Text,
			group_key: group.map(str::to_string),
			sort_order: order,
			view_roles: vec![],
			edit_roles: vec![],
			is_hidden: false,
			is_readonly: false,
			validation: None,
			updated_at: None,
			updated_by: None,
		}
	}

	#[test]
	fn number_values() {
		assert_eq!(
			parse_setting_value(&values(&["42"]), SettingInputType::Number),
			Ok(json!(42))
		);
		assert_eq!(
			parse_setting_value(&values(&["1.5"]), SettingInputType::Number),
			Ok(json!(1.5))
		);
		assert_eq!(
			parse_setting_value(&values(&[""]), SettingInputType::Number),
			Ok(Value::Null)
		);
		assert!(matches!(
			parse_setting_value(&values(&["abc"]), SettingInputType::Number),
			Err(SettingValueError::InvalidNumber(_))
		));
	}

	#[test]
	fn boolean_values() {
		for (raw, expected) in [("on", true), ("true", true), ("false", false), ("", false)] {
			assert_eq!(
				parse_setting_value(&values(&[raw]), SettingInputType::Boolean),
				Ok(Value::Bool(expected))
			);
		}
		assert_eq!(parse_default_value("on", SettingInputType::Boolean), Ok(json!(false)));
		assert_eq!(parse_default_value("true", SettingInputType::Boolean), Ok(json!(true)));
	}

	#[test]
	fn json_values() {
		assert_eq!(
			parse_setting_value(&values(&[r#"{"a":1}"#]), SettingInputType::Json),
			Ok(json!({"a": 1}))
		);
		assert!(matches!(
			parse_setting_value(&values(&["{not json"]), SettingInputType::Json),
			Err(SettingValueError::InvalidJson(_))
		));
	}

	#[test]
	fn multiselect_keeps_every_value() {
		assert_eq!(
			parse_setting_value(&values(&["a", "b"]), SettingInputType::Multiselect),
			Ok(json!(["a", "b"]))
		);
		assert_eq!(
			parse_setting_value(&[], SettingInputType::Multiselect),
			Ok(Value::Null)
		);
	}

	#[test]
	fn text_values() {
		assert_eq!(
			parse_setting_value(&values(&["hello"]), SettingInputType::Color),
			Ok(json!("hello"))
		);
		assert_eq!(
			parse_setting_value(&values(&[""]), SettingInputType::Text),
			Ok(Value::Null)
		);
	}

	#[test]
	fn required_rule() {
		let rules = ValidationRules {
			required: true,
			..Default::default()
		};
		assert_eq!(
			validate_setting_value(&Value::Null, &rules),
			Err("This setting is required".to_string())
		);
		assert!(validate_setting_value(&json!("x"), &rules).is_ok());
	}

	#[test]
	fn min_max_rules() {
		let rules = ValidationRules {
			min: Some(1.0),
			max: Some(10.0),
			..Default::default()
		};
		assert_eq!(
			validate_setting_value(&json!(0), &rules),
			Err("Value must be at least 1".to_string())
		);
		assert_eq!(
			validate_setting_value(&json!(11), &rules),
			Err("Value must be at most 10".to_string())
		);
		assert!(validate_setting_value(&json!(5), &rules).is_ok());
		assert!(validate_setting_value(&Value::Null, &rules).is_ok());
	}

	#[test]
	fn pattern_rule() {
		let rules = ValidationRules {
			pattern: Some("^[a-z]+$".to_string()),
			..Default::default()
		};
		assert!(validate_setting_value(&json!("abc"), &rules).is_ok());
		assert_eq!(
			validate_setting_value(&json!("ABC"), &rules),
			Err("Value does not match the required pattern".to_string())
		);
		assert!(validate_setting_value(&json!(5), &rules).is_ok());
	}

	#[test]
	fn formatting() {
		assert_eq!(format_setting_value(&Value::Null, SettingInputType::Text), "");
		assert_eq!(format_setting_value(&json!(true), SettingInputType::Boolean), "Yes");
		assert_eq!(format_setting_value(&json!(false), SettingInputType::Boolean), "No");
		assert_eq!(format_setting_value(&json!("hi"), SettingInputType::Text), "hi");
		assert_eq!(format_setting_value(&json!(3), SettingInputType::Number), "3");
		assert_eq!(
			format_setting_value(&json!(["a"]), SettingInputType::Multiselect),
			"[\n  \"a\"\n]"
		);
	}

	#[test]
	fn group_key_formatting() {
		assert_eq!(format_group_key("site_config"), "Site Config");
		assert_eq!(format_group_key("general"), "General");
	}

	#[test]
	fn grouping_and_sorting() {
		let mut settings = vec![
			setting("b", Some("site"), Some(2)),
			setting("a", None, None),
			setting("c", Some("site"), Some(1)),
		];
		sort_settings(&mut settings);
		let ids: Vec<_> = settings.iter().map(|s| s.key.as_str()).collect();
		assert_eq!(ids, ["a", "c", "b"]);

		let groups = group_settings(settings);
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].0, DEFAULT_GROUP);
		assert_eq!(groups[1].0, "site");
		assert_eq!(groups[1].1.len(), 2);
	}
}
