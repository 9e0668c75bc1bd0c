// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration.

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct AuditConfig {
	pub enabled: bool,
	/// Emit every entry as a structured tracing event.
	pub tracing_sink: bool,
	/// Persist entries to the backend `logs` table.
	pub store_sink: bool,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub tracing_sink: Option<bool>,
	#[serde(default)]
	pub store_sink: Option<bool>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: AuditConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.tracing_sink.is_some() {
			self.tracing_sink = other.tracing_sink;
		}
		if other.store_sink.is_some() {
			self.store_sink = other.store_sink;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			tracing_sink: self.tracing_sink.unwrap_or(true),
			store_sink: self.store_sink.unwrap_or(true),
		}
	}
}
