// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The append-only `logs` table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_server_auth::UserId;

use crate::error::Result;
use crate::query::{Filter, Query};
use crate::store::DataStore;

pub const TABLE: &str = "logs";
pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogInsert {
	pub user_id: Option<UserId>,
	pub action: String,
	pub entity_type: Option<String>,
	pub entity_id: Option<String>,
	pub ip_address: Option<String>,
	pub metadata: Option<Value>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogActor {
	#[serde(default)]
	pub full_name: Option<String>,
	#[serde(default)]
	pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
	pub id: Value,
	#[serde(default)]
	pub user_id: Option<UserId>,
	pub action: String,
	#[serde(default)]
	pub entity_type: Option<String>,
	#[serde(default)]
	pub entity_id: Option<String>,
	#[serde(default)]
	pub ip_address: Option<String>,
	#[serde(default)]
	pub metadata: Option<Value>,
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
	/// Joined profile of the acting user.
	#[serde(default, rename = "profiles")]
	pub actor: Option<LogActor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
	pub limit: Option<u64>,
	pub offset: Option<u64>,
	/// Case-insensitive match on action or entity type.
	pub search: Option<String>,
}

impl LogQuery {
	pub fn limit_clamped(&self) -> u64 {
		self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
	}
}

#[derive(Clone)]
pub struct LogRepository {
	store: Arc<dyn DataStore>,
}

impl LogRepository {
	pub fn new(store: Arc<dyn DataStore>) -> Self {
		Self { store }
	}

	#[tracing::instrument(skip(self, entry), fields(action = %entry.action))]
	pub async fn insert(&self, entry: &LogInsert) -> Result<()> {
		self.store
			.insert(TABLE, serde_json::to_value(entry)?)
			.await?;
		Ok(())
	}

	/// Newest entries first, with the actor's profile joined. Also returns
	/// the total number of matches when the backend reports it.
	#[tracing::instrument(skip(self))]
	pub async fn list(&self, params: &LogQuery) -> Result<(Vec<LogRecord>, Option<u64>)> {
		let mut query = Query::table(TABLE)
			.select("*, profiles(full_name, company_name)")
			.order("created_at", false)
			.range(params.offset.unwrap_or(0), params.limit_clamped())
			.with_count();

		if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
			let pattern = format!("*{term}*");
			query = query.filter(Filter::Or(vec![
				Filter::ilike("action", &pattern),
				Filter::ilike("entity_type", &pattern),
			]));
		}

		let page = self.store.select(&query).await?;
		let total = page.total;
		Ok((page.into_rows()?, total))
	}
}
