// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PostgREST HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use steward_common_secret::SecretString;
use tracing::{debug, error, instrument, trace};

use crate::error::{DbError, Result};
use crate::query::{Filter, Query};
use crate::store::{DataStore, Page};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Data API client for `{project}/rest/v1`, authenticated with the
/// service-role key.
#[derive(Clone)]
pub struct PostgrestStore {
	http_client: Client,
	base_url: String,
	api_key: SecretString,
}

impl std::fmt::Debug for PostgrestStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PostgrestStore")
			.field("base_url", &self.base_url)
			.finish()
	}
}

/// Parses the total from a `Content-Range` header such as `0-24/3573`.
fn parse_total(content_range: &str) -> Option<u64> {
	content_range.rsplit('/').next()?.parse().ok()
}

impl PostgrestStore {
	pub fn new(project_url: &str, api_key: SecretString) -> Result<Self> {
		Self::with_timeout(project_url, api_key, DEFAULT_TIMEOUT)
	}

	pub fn with_timeout(project_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
		Ok(Self {
			http_client: steward_common_http::client_with_timeout(timeout)?,
			base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
			api_key,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
		builder
			.header("apikey", self.api_key.expose())
			.bearer_auth(self.api_key.expose())
	}

	fn table_url(&self, table: &str) -> String {
		format!("{}/{}", self.base_url, table)
	}

	async fn send(&self, builder: RequestBuilder) -> Result<Response> {
		let response = builder.send().await.map_err(|e| {
			if e.is_timeout() {
				error!("Data API request timed out");
				return DbError::Timeout;
			}
			error!(error = %e, "Network error during data API request");
			DbError::Network(e)
		})?;

		let status = response.status();
		debug!(status = %status, "Received response from data API");
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		error!(status = status.as_u16(), body = %body, "Data API error");
		Err(match status {
			StatusCode::NOT_FOUND => DbError::NotFound(body),
			StatusCode::CONFLICT => DbError::Conflict(body),
			_ => DbError::Rejected {
				status: status.as_u16(),
				message: body,
			},
		})
	}

	async fn json(response: Response) -> Result<Value> {
		let body = response.text().await?;
		trace!(len = body.len(), "Data API response body");
		if body.trim().is_empty() {
			return Ok(Value::Null);
		}
		Ok(serde_json::from_str(&body)?)
	}

	async fn rows(response: Response) -> Result<Vec<Value>> {
		match Self::json(response).await? {
			Value::Array(rows) => Ok(rows),
			Value::Null => Ok(Vec::new()),
			other => Ok(vec![other]),
		}
	}

	fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
		filters.iter().map(Filter::to_param).collect()
	}
}

#[async_trait]
impl DataStore for PostgrestStore {
	#[instrument(skip(self, query), fields(table = %query.table))]
	async fn select(&self, query: &Query) -> Result<Page> {
		let mut builder = self
			.authed(self.http_client.get(self.table_url(&query.table)))
			.query(&query.to_params());
		if query.count {
			builder = builder.header("Prefer", "count=exact");
		}

		let response = self.send(builder).await?;
		let total = response
			.headers()
			.get(CONTENT_RANGE)
			.and_then(|v| v.to_str().ok())
			.and_then(parse_total);
		let rows = Self::rows(response).await?;
		debug!(rows = rows.len(), ?total, "selected rows");
		Ok(Page { rows, total })
	}

	#[instrument(skip(self, row))]
	async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>> {
		let builder = self
			.authed(self.http_client.post(self.table_url(table)))
			.header("Prefer", "return=representation")
			.json(&row);
		Self::rows(self.send(builder).await?).await
	}

	#[instrument(skip(self, filters, patch))]
	async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
		let builder = self
			.authed(self.http_client.patch(self.table_url(table)))
			.query(&Self::filter_params(filters))
			.header("Prefer", "return=representation")
			.json(&patch);
		Self::rows(self.send(builder).await?).await
	}

	#[instrument(skip(self, filters))]
	async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
		let builder = self
			.authed(self.http_client.delete(self.table_url(table)))
			.query(&Self::filter_params(filters))
			.header("Prefer", "return=representation");
		Self::rows(self.send(builder).await?).await
	}

	#[instrument(skip(self, args))]
	async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
		let builder = self
			.authed(
				self.http_client
					.post(format!("{}/rpc/{}", self.base_url, function)),
			)
			.json(&args);
		Self::json(self.send(builder).await?).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn content_range_total() {
		assert_eq!(parse_total("0-24/3573"), Some(3573));
		assert_eq!(parse_total("*/0"), Some(0));
		assert_eq!(parse_total("0-24/*"), None);
	}

	#[test]
	fn base_url_appends_rest_prefix() {
		let store = PostgrestStore::new("https://p.example.co/", SecretString::from("k")).unwrap();
		assert_eq!(store.base_url(), "https://p.example.co/rest/v1");
	}
}
