// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

pub use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;

pub mod store;
pub mod tracing;

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
	/// Unique name for this sink (used in logs).
	fn name(&self) -> &str;

	async fn publish(&self, entry: &AuditLogEntry) -> Result<(), AuditSinkError>;
}
