// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for the identity provider client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	/// The token or key was rejected.
	#[error("Unauthorized")]
	Unauthorized,

	#[error("Not found")]
	NotFound,

	/// The provider refused the request.
	#[error("Identity provider error: {status} - {message}")]
	Rejected { status: u16, message: String },

	#[error("Invalid response from identity provider: {0}")]
	InvalidResponse(String),

	#[error("Invalid identity provider URL: {0}")]
	InvalidUrl(String),

	/// An admin call was made without a service-role key configured.
	#[error("Missing credential: {0}")]
	MissingKey(&'static str),
}

impl ProviderError {
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, ProviderError::Unauthorized)
	}
}
