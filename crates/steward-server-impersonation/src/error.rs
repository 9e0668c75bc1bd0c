// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failure category, mapped onto an HTTP status by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Unauthenticated,
	Forbidden,
	InvalidRequest,
	NotFound,
	Conflict,
	/// The stashed envelope could not be decoded.
	Corrupted,
	/// An identity provider or stash call failed or timed out.
	Upstream,
}

impl ErrorKind {
	pub fn status(&self) -> u16 {
		match self {
			ErrorKind::InvalidRequest => 400,
			ErrorKind::Unauthenticated => 401,
			ErrorKind::Forbidden => 403,
			ErrorKind::NotFound => 404,
			ErrorKind::Conflict => 409,
			ErrorKind::Corrupted | ErrorKind::Upstream => 500,
		}
	}

	/// Short machine-readable code for error bodies.
	pub fn code(&self) -> &'static str {
		match self {
			ErrorKind::Unauthenticated => "unauthorized",
			ErrorKind::Forbidden => "forbidden",
			ErrorKind::InvalidRequest => "bad_request",
			ErrorKind::NotFound => "not_found",
			ErrorKind::Conflict => "conflict",
			ErrorKind::Corrupted => "corrupted_session",
			ErrorKind::Upstream => "upstream_error",
		}
	}
}

/// Step of an impersonation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Validating,
	Stashing,
	Resolving,
	LinkGenerating,
	TokenExtracting,
	/// Reading the stash on stop.
	Loading,
	Decoding,
	Restoring,
}

impl Stage {
	/// Start stages that run once the admin session has been stashed.
	pub fn is_after_stashing(&self) -> bool {
		matches!(
			self,
			Stage::Resolving | Stage::LinkGenerating | Stage::TokenExtracting
		)
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Stage::Validating => "validating",
			Stage::Stashing => "stashing",
			Stage::Resolving => "resolving",
			Stage::LinkGenerating => "link_generating",
			Stage::TokenExtracting => "token_extracting",
			Stage::Loading => "loading",
			Stage::Decoding => "decoding",
			Stage::Restoring => "restoring",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({kind:?} while {stage})")]
pub struct ImpersonationError {
	pub kind: ErrorKind,
	pub stage: Stage,
	pub message: String,
	/// Request fields implicated in the failure.
	pub fields: Vec<String>,
}

impl ImpersonationError {
	pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
		Self {
			kind,
			stage,
			message: message.into(),
			fields: Vec::new(),
		}
	}

	pub fn with_field(mut self, field: impl Into<String>) -> Self {
		self.fields.push(field.into());
		self
	}

	pub fn unauthenticated(stage: Stage) -> Self {
		Self::new(ErrorKind::Unauthenticated, stage, "Not authenticated")
	}

	pub fn invalid(stage: Stage, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidRequest, stage, message)
	}

	pub fn not_found(stage: Stage, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::NotFound, stage, message)
	}

	pub fn upstream(stage: Stage, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Upstream, stage, message)
	}

	pub fn status(&self) -> u16 {
		self.kind.status()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_map_to_statuses() {
		assert_eq!(ErrorKind::InvalidRequest.status(), 400);
		assert_eq!(ErrorKind::Unauthenticated.status(), 401);
		assert_eq!(ErrorKind::Forbidden.status(), 403);
		assert_eq!(ErrorKind::NotFound.status(), 404);
		assert_eq!(ErrorKind::Conflict.status(), 409);
		assert_eq!(ErrorKind::Corrupted.status(), 500);
		assert_eq!(ErrorKind::Upstream.status(), 500);
	}

	#[test]
	fn display_names_stage() {
		let err = ImpersonationError::invalid(Stage::Validating, "User ID is required")
			.with_field("user_id");
		assert_eq!(
			err.to_string(),
			"User ID is required (InvalidRequest while validating)"
		);
		assert_eq!(err.fields, vec!["user_id"]);
	}
}
