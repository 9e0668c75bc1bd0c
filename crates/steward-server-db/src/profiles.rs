// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use serde_json::json;
use steward_server_auth::{Profile, UserId};

use crate::error::Result;
use crate::query::{Filter, Query};
use crate::store::DataStore;

pub const TABLE: &str = "profiles";
const SELECT_WITH_ROLE: &str = "*, roles(name, colour)";

#[derive(Clone)]
pub struct ProfileRepository {
	store: Arc<dyn DataStore>,
}

impl ProfileRepository {
	pub fn new(store: Arc<dyn DataStore>) -> Self {
		Self { store }
	}

	/// Profile with its role's name and colour.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get(&self, id: &UserId) -> Result<Option<Profile>> {
		let query = Query::table(TABLE)
			.select(SELECT_WITH_ROLE)
			.filter(Filter::eq("id", id));
		self.store.select(&query).await?.into_first()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<Profile>> {
		let query = Query::table(TABLE).select(SELECT_WITH_ROLE);
		self.store.select(&query).await?.into_rows()
	}

	/// Name of the user's role, if they have a profile with a role.
	pub async fn role_name(&self, id: &UserId) -> Result<Option<String>> {
		Ok(self
			.get(id)
			.await?
			.and_then(|p| p.role.map(|r| r.name)))
	}

	#[tracing::instrument(skip(self, full_name), fields(user_id = %id))]
	pub async fn create(&self, id: &UserId, full_name: &str) -> Result<()> {
		self.store
			.insert(TABLE, json!({ "id": id, "full_name": full_name }))
			.await?;
		Ok(())
	}

	/// Updates the editable profile fields. Returns false when no profile
	/// row exists for `id`.
	#[tracing::instrument(skip(self, full_name, company_name), fields(user_id = %id))]
	pub async fn update(
		&self,
		id: &UserId,
		full_name: &str,
		company_name: Option<&str>,
	) -> Result<bool> {
		let patch = json!({
			"full_name": full_name,
			"company_name": company_name.filter(|c| !c.is_empty()),
			"updated_at": chrono::Utc::now(),
		});
		let rows = self
			.store
			.update(TABLE, &[Filter::eq("id", id)], patch)
			.await?;
		Ok(!rows.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MemoryStore;

	#[tokio::test]
	async fn role_name_comes_from_joined_role() {
		let store = Arc::new(MemoryStore::new());
		store.seed("roles", vec![json!({"id": 7, "name": "admin", "colour": "#112233"})]);
		store.seed(
			TABLE,
			vec![
				json!({"id": "u1", "full_name": "Ada", "role_id": 7}),
				json!({"id": "u2", "full_name": "Bo", "role_id": null}),
			],
		);
		let repo = ProfileRepository::new(store);

		assert_eq!(
			repo.role_name(&UserId::new("u1")).await.unwrap().as_deref(),
			Some("admin")
		);
		assert_eq!(repo.role_name(&UserId::new("u2")).await.unwrap(), None);
		assert_eq!(repo.role_name(&UserId::new("missing")).await.unwrap(), None);
	}

	#[tokio::test]
	async fn update_reports_missing_profile() {
		let store = Arc::new(MemoryStore::new());
		let repo = ProfileRepository::new(store.clone());
		assert!(!repo.update(&UserId::new("u1"), "Ada", None).await.unwrap());

		repo.create(&UserId::new("u1"), "Ada").await.unwrap();
		assert!(repo
			.update(&UserId::new("u1"), "Ada L", Some("Engines Ltd"))
			.await
			.unwrap());
		let profile = repo.get(&UserId::new("u1")).await.unwrap().unwrap();
		assert_eq!(profile.full_name.as_deref(), Some("Ada L"));
		assert_eq!(profile.company_name.as_deref(), Some("Engines Ltd"));
	}
}
