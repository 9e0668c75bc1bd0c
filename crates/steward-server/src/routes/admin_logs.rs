// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Audit log listing.
//!
//! - GET /api/admin/logs - newest entries first, searchable by action or
//!   entity type
//!
//! Requires an admin role.

use axum::{
	extract::{Query, State},
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use steward_server_db::{LogQuery, LogRecord};

use crate::api::AppState;
use crate::api_response::{internal_error, AdminErrorResponse};
use crate::auth_middleware::RequireAuth;
use crate::routes::require_admin;

#[derive(Debug, Default, Deserialize)]
pub struct ListLogsParams {
	pub limit: Option<u64>,
	pub offset: Option<u64>,
	pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListLogsResponse {
	pub logs: Vec<LogRecord>,
	/// Total matching entries, when the store reports it.
	pub total: Option<u64>,
	pub limit: u64,
	pub offset: u64,
}

/// GET /api/admin/logs
#[tracing::instrument(
	skip(state, current_user),
	fields(actor_id = %current_user.id(), limit = ?params.limit, search = ?params.search)
)]
pub async fn list_logs(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	Query(params): Query<ListLogsParams>,
) -> Response {
	if let Err(response) = require_admin(&state, current_user.id()).await {
		return response;
	}

	let query = LogQuery {
		limit: params.limit,
		offset: params.offset,
		search: params.search,
	};
	match state.logs.list(&query).await {
		Ok((logs, total)) => Json(ListLogsResponse {
			logs,
			total,
			limit: query.limit_clamped(),
			offset: query.offset.unwrap_or(0),
		})
		.into_response(),
		Err(e) => {
			tracing::error!(error = %e, "Failed to list logs");
			internal_error::<AdminErrorResponse>("Failed to list logs").into_response()
		}
	}
}
