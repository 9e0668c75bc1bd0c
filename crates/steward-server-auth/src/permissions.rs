// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role and setting predicates.
//!
//! All functions are pure and total. A missing role or profile never grants
//! anything, except where a setting carries no role restriction at all.

use crate::records::{Profile, Role, RoleSummary, Setting};

/// Label shown for users without a role.
pub const NO_ROLE: &str = "No Role";

/// Anything that carries a role name.
pub trait NamedRole {
	fn role_name(&self) -> &str;
}

impl NamedRole for Role {
	fn role_name(&self) -> &str {
		&self.name
	}
}

impl NamedRole for RoleSummary {
	fn role_name(&self) -> &str {
		&self.name
	}
}

fn role_allowed(allowed: &[String], role_name: Option<&str>) -> bool {
	if allowed.is_empty() {
		return true;
	}
	match role_name {
		Some(name) => allowed.iter().any(|r| r == name),
		None => false,
	}
}

/// Whether a user holding `role_name` may see `setting`.
pub fn can_view(setting: &Setting, role_name: Option<&str>) -> bool {
	role_allowed(&setting.view_roles, role_name)
}

/// Whether a user holding `role_name` may change `setting`.
pub fn can_edit(setting: &Setting, role_name: Option<&str>) -> bool {
	role_allowed(&setting.edit_roles, role_name)
}

pub fn has_role<R: NamedRole>(role: Option<&R>, name: &str) -> bool {
	role.is_some_and(|r| r.role_name() == name)
}

pub fn has_any_role<R: NamedRole, S: AsRef<str>>(role: Option<&R>, names: &[S]) -> bool {
	role.is_some_and(|r| names.iter().any(|n| n.as_ref() == r.role_name()))
}

/// The role's name, or `default` when there is no role or it is unnamed.
pub fn role_name_or<'a, R: NamedRole>(role: Option<&'a R>, default: &'a str) -> &'a str {
	match role {
		Some(r) if !r.role_name().is_empty() => r.role_name(),
		_ => default,
	}
}

/// Which profile fields count towards a complete profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileRequirement {
	/// Full name and company name.
	#[default]
	Basic,
	/// Full name, company name and website.
	WithWebsite,
}

pub fn has_full_profile(profile: Option<&Profile>, requirement: ProfileRequirement) -> bool {
	let Some(profile) = profile else {
		return false;
	};
	let filled = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());

	let basic = filled(&profile.full_name) && filled(&profile.company_name);
	match requirement {
		ProfileRequirement::Basic => basic,
		ProfileRequirement::WithWebsite => basic && filled(&profile.website),
	}
}
