// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! API response helpers.
//!
//! Every error body has the shape `{error, message, error_fields?}` where
//! `error` is a stable machine-readable code.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use steward_server_auth::ValidationResult;
use steward_server_impersonation::ImpersonationError;

/// Trait for API error response types that have `error` and `message` fields.
pub trait ApiErrorResponse: Serialize + Send {
	fn new(error: impl Into<String>, message: impl Into<String>) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminErrorResponse {
	pub error: String,
	pub message: String,
	/// Form fields the error refers to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_fields: Option<Vec<String>>,
}

impl ApiErrorResponse for AdminErrorResponse {
	fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
			error_fields: None,
		}
	}
}

impl AdminErrorResponse {
	pub fn with_fields(mut self, fields: Vec<String>) -> Self {
		if !fields.is_empty() {
			self.error_fields = Some(fields);
		}
		self
	}
}

/// Create a 400 Bad Request response.
pub fn bad_request<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::BAD_REQUEST, Json(T::new(error, message)))
}

/// Create a 409 Conflict response.
pub fn conflict<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::CONFLICT, Json(T::new(error, message)))
}

/// Create a 404 Not Found response.
pub fn not_found<T: ApiErrorResponse>(message: impl Into<String>) -> (StatusCode, Json<T>) {
	(StatusCode::NOT_FOUND, Json(T::new("not_found", message)))
}

/// Create a 500 Internal Server Error response.
pub fn internal_error<T: ApiErrorResponse>(message: impl Into<String>) -> (StatusCode, Json<T>) {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Json(T::new("internal_error", message)),
	)
}

/// Create a 403 Forbidden response.
pub fn forbidden<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::FORBIDDEN, Json(T::new(error, message)))
}

/// Create a 401 Unauthorized response.
pub fn unauthorized<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::UNAUTHORIZED, Json(T::new(error, message)))
}

/// 400 carrying the fields a form validation flagged.
pub fn validation_error(result: ValidationResult) -> Response {
	let message = result
		.error
		.unwrap_or_else(|| "Invalid request".to_string());
	(
		StatusCode::BAD_REQUEST,
		Json(AdminErrorResponse::new("bad_request", message).with_fields(result.error_fields)),
	)
		.into_response()
}

/// Maps an impersonation failure to its status and error body.
pub fn impersonation_error(err: &ImpersonationError) -> Response {
	let status =
		StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
	let body = AdminErrorResponse::new(err.kind.code(), err.message.clone())
		.with_fields(err.fields.clone());
	(status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
	use super::*;
	use steward_server_impersonation::{ErrorKind, Stage};

	#[test]
	fn error_fields_are_omitted_when_empty() {
		let body = serde_json::to_value(AdminErrorResponse::new("bad_request", "nope")).unwrap();
		assert_eq!(body["error"], "bad_request");
		assert!(body.get("error_fields").is_none());
	}

	#[test]
	fn impersonation_errors_keep_kind_and_fields() {
		let err = ImpersonationError::invalid(Stage::Validating, "Cannot impersonate yourself")
			.with_field("user_id");
		let response = impersonation_error(&err);
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let conflict = ImpersonationError::new(ErrorKind::Conflict, Stage::Validating, "busy");
		assert_eq!(impersonation_error(&conflict).status(), StatusCode::CONFLICT);

		let corrupted = ImpersonationError::new(ErrorKind::Corrupted, Stage::Decoding, "bad");
		assert_eq!(
			impersonation_error(&corrupted).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}
