// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use steward_server_auth::{Setting, SettingId, SettingInputType, UserId};

use crate::error::{DbError, Result};
use crate::query::{Filter, Query};
use crate::store::DataStore;

pub const TABLE: &str = "settings";
pub const SITE_TITLE_KEY: &str = "site_title";
pub const DEFAULT_SITE_TITLE: &str = "App";

/// Columns written when a setting's value is edited.
#[derive(Debug, Clone, Serialize)]
pub struct SettingUpdate {
	pub value: Value,
	pub updated_at: DateTime<Utc>,
	pub updated_by: UserId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// `Some(None)` clears the description.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSetting {
	pub key: String,
	pub label: String,
	pub description: Option<String>,
	pub input_type: SettingInputType,
	pub group_key: String,
	pub default_value: Value,
	/// Starts out equal to the default.
	pub value: Value,
	pub view_roles: Vec<String>,
	pub edit_roles: Vec<String>,
	pub updated_by: UserId,
}

#[derive(Clone)]
pub struct SettingsRepository {
	store: Arc<dyn DataStore>,
}

impl SettingsRepository {
	pub fn new(store: Arc<dyn DataStore>) -> Self {
		Self { store }
	}

	/// All settings ordered by group, then sort order.
	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<Setting>> {
		let query = Query::table(TABLE)
			.order("group_key", true)
			.order("sort_order", true);
		self.store.select(&query).await?.into_rows()
	}

	pub async fn get(&self, id: &SettingId) -> Result<Option<Setting>> {
		let query = Query::table(TABLE).filter(Filter::eq("id", id));
		self.store.select(&query).await?.into_first()
	}

	pub async fn get_by_key(&self, key: &str) -> Result<Option<Setting>> {
		let query = Query::table(TABLE).filter(Filter::eq("key", key));
		self.store.select(&query).await?.into_first()
	}

	pub async fn key_exists(&self, key: &str) -> Result<bool> {
		let query = Query::table(TABLE)
			.select("id")
			.filter(Filter::eq("key", key));
		Ok(!self.store.select(&query).await?.rows.is_empty())
	}

	/// Value of the setting with `key`, falling back to its default.
	pub async fn value(&self, key: &str) -> Result<Option<Value>> {
		Ok(self
			.get_by_key(key)
			.await?
			.map(|s| s.effective_value().clone())
			.filter(|v| !v.is_null()))
	}

	/// The configured site title, or `"App"`.
	pub async fn site_title(&self) -> Result<String> {
		Ok(match self.value(SITE_TITLE_KEY).await? {
			Some(Value::String(s)) if !s.is_empty() => s,
			_ => DEFAULT_SITE_TITLE.to_string(),
		})
	}

	#[tracing::instrument(skip(self, update), fields(setting_id = %id))]
	pub async fn update(&self, id: &SettingId, update: &SettingUpdate) -> Result<Option<Setting>> {
		let rows = self
			.store
			.update(TABLE, &[Filter::eq("id", id)], serde_json::to_value(update)?)
			.await?;
		match rows.into_iter().next() {
			Some(row) => Ok(Some(serde_json::from_value(row)?)),
			None => Ok(None),
		}
	}

	#[tracing::instrument(skip(self, setting), fields(key = %setting.key))]
	pub async fn create(&self, setting: &NewSetting) -> Result<Setting> {
		let rows = self
			.store
			.insert(TABLE, serde_json::to_value(setting)?)
			.await?;
		let row = rows
			.into_iter()
			.next()
			.ok_or_else(|| DbError::Internal("insert returned no rows".to_string()))?;
		Ok(serde_json::from_value(row)?)
	}

	/// Returns false when nothing was deleted.
	#[tracing::instrument(skip(self), fields(setting_id = %id))]
	pub async fn delete(&self, id: &SettingId) -> Result<bool> {
		let rows = self.store.delete(TABLE, &[Filter::eq("id", id)]).await?;
		Ok(!rows.is_empty())
	}
}
