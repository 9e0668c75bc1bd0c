// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity types and access predicates for Steward.
//!
//! - [`types`]: ID newtypes, [`TokenPair`], [`Session`], [`AuthUser`]
//! - [`records`]: rows of the `roles`, `profiles` and `settings` tables
//! - [`permissions`]: pure role/setting/profile predicates
//! - [`settings`]: parsing, validating and formatting setting values
//! - [`validation`]: user form validation

pub mod permissions;
pub mod records;
pub mod settings;
pub mod types;
pub mod validation;

pub use permissions::{
	can_edit, can_view, has_any_role, has_full_profile, has_role, role_name_or, NamedRole,
	ProfileRequirement, NO_ROLE,
};
pub use records::{Profile, Role, RoleSummary, Setting, ValidationRules};
pub use settings::{
	format_group_key, format_setting_value, group_settings, parse_default_value,
	parse_setting_value, sort_settings, validate_setting_value, SettingInputType,
	SettingValueError, DEFAULT_GROUP,
};
pub use types::{AuthUser, RoleId, Session, SettingId, TokenPair, UserId};
pub use validation::{validate_user_create, validate_user_update, ValidationResult};
