// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use serde_json::json;
use steward_server_auth::{Role, RoleId};

use crate::error::Result;
use crate::query::{Filter, Query};
use crate::store::DataStore;

pub const TABLE: &str = "roles";

/// `#RRGGBB`
pub fn is_hex_colour(colour: &str) -> bool {
	colour.len() == 7
		&& colour.starts_with('#')
		&& colour[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Clone)]
pub struct RoleRepository {
	store: Arc<dyn DataStore>,
}

impl RoleRepository {
	pub fn new(store: Arc<dyn DataStore>) -> Self {
		Self { store }
	}

	/// All roles ordered by name.
	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<Role>> {
		let query = Query::table(TABLE).order("name", true);
		self.store.select(&query).await?.into_rows()
	}

	pub async fn get(&self, id: &RoleId) -> Result<Option<Role>> {
		let query = Query::table(TABLE).filter(Filter::eq("id", id));
		self.store.select(&query).await?.into_first()
	}

	/// Sets a role's colour; `None` when the role does not exist.
	#[tracing::instrument(skip(self), fields(role_id = %id))]
	pub async fn update_colour(&self, id: &RoleId, colour: &str) -> Result<Option<Role>> {
		let rows = self
			.store
			.update(TABLE, &[Filter::eq("id", id)], json!({ "colour": colour }))
			.await?;
		match rows.into_iter().next() {
			Some(row) => Ok(Some(serde_json::from_value(row)?)),
			None => Ok(None),
		}
	}
}
