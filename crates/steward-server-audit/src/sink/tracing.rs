// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use super::{AuditSink, AuditSinkError};
use crate::event::AuditLogEntry;

/// Emits each entry as a structured `tracing` event on the `audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn publish(&self, entry: &AuditLogEntry) -> Result<(), AuditSinkError> {
		let actor_user_id = entry.actor_user_id.as_ref().map(|u| u.as_str());
		tracing::info!(
			target: "audit",
			action = %entry.action,
			timestamp = %entry.timestamp.to_rfc3339(),
			actor_user_id,
			entity_type = %entry.entity_type,
			entity_id = entry.entity_id.as_deref(),
			ip_address = entry.ip_address.as_deref(),
			metadata = %entry.metadata,
			"audit event"
		);
		Ok(())
	}
}
