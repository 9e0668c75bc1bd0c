// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::query::{Filter, Query};

/// Rows returned by a select, plus the total match count when requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
	pub rows: Vec<Value>,
	pub total: Option<u64>,
}

impl Page {
	pub fn into_rows<T: DeserializeOwned>(self) -> Result<Vec<T>> {
		self.rows
			.into_iter()
			.map(|row| serde_json::from_value(row).map_err(Into::into))
			.collect()
	}

	pub fn into_first<T: DeserializeOwned>(self) -> Result<Option<T>> {
		match self.rows.into_iter().next() {
			Some(row) => Ok(Some(serde_json::from_value(row)?)),
			None => Ok(None),
		}
	}
}

/// Generic access to the external relational store.
///
/// Mutations return the affected rows.
#[async_trait]
pub trait DataStore: Send + Sync {
	async fn select(&self, query: &Query) -> Result<Page>;

	async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>>;

	async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;

	async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;

	/// Calls a stored procedure.
	async fn rpc(&self, function: &str, args: Value) -> Result<Value>;
}
