// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User form validation.
//!
//! Every field is checked; `error` carries the message of the last failing
//! field and `error_fields` lists each failing field once.

use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 72;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub error_fields: Vec<String>,
}

impl ValidationResult {
	fn fail(&mut self, field: &str, message: &str) {
		self.error = Some(message.to_string());
		if !self.error_fields.iter().any(|f| f == field) {
			self.error_fields.push(field.to_string());
		}
	}

	fn finish(mut self) -> Self {
		self.valid = self.error_fields.is_empty();
		self
	}
}

pub fn is_valid_email(email: &str) -> bool {
	!email.is_empty() && email.contains('@')
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
	if password.is_empty() {
		return Err("Password is required");
	}
	let len = password.chars().count();
	if len < MIN_PASSWORD_LEN {
		return Err("Password must be at least 6 characters long");
	}
	if len > MAX_PASSWORD_LEN {
		return Err("Password can be at most 72 characters long");
	}
	Ok(())
}

fn check_email(result: &mut ValidationResult, email: &str) {
	if email.is_empty() {
		result.fail("email", "Email is required");
	} else if !is_valid_email(email) {
		result.fail("email", "A valid email address is required");
	}
}

fn check_full_name(result: &mut ValidationResult, full_name: &str) {
	if full_name.is_empty() {
		result.fail("full_name", "Full name is required");
	}
}

pub fn validate_user_create(email: &str, password: &str, full_name: &str) -> ValidationResult {
	let mut result = ValidationResult::default();
	check_email(&mut result, email);
	if let Err(message) = validate_password(password) {
		result.fail("password", message);
	}
	check_full_name(&mut result, full_name);
	result.finish()
}

pub fn validate_user_update(email: &str, full_name: &str) -> ValidationResult {
	let mut result = ValidationResult::default();
	check_email(&mut result, email);
	check_full_name(&mut result, full_name);
	result.finish()
}
