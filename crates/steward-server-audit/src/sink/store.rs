// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use steward_server_db::{DbError, LogInsert, LogRepository};

use super::{AuditSink, AuditSinkError};
use crate::event::AuditLogEntry;

/// Appends entries to the backend `logs` table.
pub struct StoreAuditSink {
	logs: LogRepository,
}

impl StoreAuditSink {
	pub fn new(logs: LogRepository) -> Self {
		Self { logs }
	}
}

fn to_insert(entry: &AuditLogEntry) -> LogInsert {
	LogInsert {
		user_id: entry.actor_user_id.clone(),
		action: entry.action.as_str().to_string(),
		entity_type: Some(entry.entity_type.clone()),
		entity_id: entry.entity_id.clone(),
		ip_address: entry.ip_address.clone(),
		metadata: (!entry.metadata.is_null()).then(|| entry.metadata.clone()),
		created_at: entry.timestamp,
	}
}

#[async_trait]
impl AuditSink for StoreAuditSink {
	fn name(&self) -> &str {
		"store"
	}

	async fn publish(&self, entry: &AuditLogEntry) -> Result<(), AuditSinkError> {
		self.logs.insert(&to_insert(entry)).await.map_err(|e| match e {
			DbError::Network(_) | DbError::Timeout => AuditSinkError::Transient(e.to_string()),
			other => AuditSinkError::Permanent(other.to_string()),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::event::AuditAction;
	use serde_json::json;
	use steward_server_auth::UserId;
	use steward_server_db::testing::MemoryStore;

	#[tokio::test]
	async fn writes_log_row() {
		let store = Arc::new(MemoryStore::new());
		let sink = StoreAuditSink::new(LogRepository::new(store.clone()));
		let entry = AuditLogEntry::builder(AuditAction::UpdateRoleColour)
			.actor(UserId::new("admin-1"))
			.entity("3")
			.metadata(json!({"colour": "#ABCDEF"}))
			.build();

		sink.publish(&entry).await.unwrap();

		let rows = store.rows("logs");
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["action"], "update_role_colour");
		assert_eq!(rows[0]["entity_type"], "role");
		assert_eq!(rows[0]["entity_id"], "3");
		assert_eq!(rows[0]["user_id"], "admin-1");
		assert_eq!(rows[0]["metadata"]["colour"], "#ABCDEF");
	}

	#[tokio::test]
	async fn store_failure_is_permanent() {
		let store = Arc::new(MemoryStore::new());
		store.fail("logs");
		let sink = StoreAuditSink::new(LogRepository::new(store));
		let entry = AuditLogEntry::builder(AuditAction::CreateUser).build();
		assert!(matches!(
			sink.publish(&entry).await,
			Err(AuditSinkError::Permanent(_))
		));
	}
}
