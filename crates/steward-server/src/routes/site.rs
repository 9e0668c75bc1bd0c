// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use axum::{
	extract::State,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;

use crate::api::AppState;
use crate::api_response::{internal_error, AdminErrorResponse};

#[derive(Debug, Serialize)]
pub struct SiteResponse {
	pub site_title: String,
}

/// GET /api/site - Public site metadata for page layouts.
pub async fn get_site(State(state): State<AppState>) -> Response {
	match state.settings.site_title().await {
		Ok(site_title) => Json(SiteResponse { site_title }).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "Failed to load site title");
			internal_error::<AdminErrorResponse>("Failed to load site settings").into_response()
		}
	}
}
