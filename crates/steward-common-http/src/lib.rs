// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.
//!
//! Both backend clients (identity and data) are built from [`builder`] so
//! requests are identifiable in the provider's logs.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a client builder carrying the standard Steward User-Agent.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a client with the given per-request timeout.
pub fn client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Returns the standard User-Agent string: `steward/{version}`.
pub fn user_agent() -> String {
	format!("steward/{}", env!("CARGO_PKG_VERSION"))
}
