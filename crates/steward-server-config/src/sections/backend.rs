// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hosted backend (identity + data API) configuration.

use serde::Deserialize;
use std::time::Duration;
use steward_common_config::SecretString;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";

/// Backend configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct BackendConfig {
	/// Project root URL; `/auth/v1` and `/rest/v1` are appended per client.
	pub url: String,
	pub anon_key: Option<SecretString>,
	pub service_role_key: Option<SecretString>,
	pub request_timeout_secs: u64,
}

impl BackendConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

impl Default for BackendConfig {
	fn default() -> Self {
		BackendConfigLayer::default().finalize()
	}
}

/// Backend configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub anon_key: Option<SecretString>,
	#[serde(default)]
	pub service_role_key: Option<SecretString>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
}

impl BackendConfigLayer {
	pub fn merge(&mut self, other: BackendConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.anon_key.is_some() {
			self.anon_key = other.anon_key;
		}
		if other.service_role_key.is_some() {
			self.service_role_key = other.service_role_key;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
	}

	pub fn finalize(self) -> BackendConfig {
		BackendConfig {
			url: self
				.url
				.map(|u| u.trim_end_matches('/').to_string())
				.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
			anon_key: self.anon_key,
			service_role_key: self.service_role_key,
			request_timeout_secs: self.request_timeout_secs.unwrap_or(10),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = BackendConfig::default();
		assert_eq!(config.url, DEFAULT_BACKEND_URL);
		assert!(config.anon_key.is_none());
		assert_eq!(config.request_timeout(), Duration::from_secs(10));
	}

	#[test]
	fn trailing_slash_is_trimmed() {
		let config = BackendConfigLayer {
			url: Some("https://project.example.co/".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.url, "https://project.example.co");
	}

	#[test]
	fn keys_are_redacted_in_debug() {
		let config = BackendConfigLayer {
			service_role_key: Some(SecretString::new("service-role-jwt".to_string())),
			..Default::default()
		}
		.finalize();
		let debug = format!("{config:?}");
		assert!(!debug.contains("service-role-jwt"));
	}
}
