// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Steward administration server.
//!
//! Serves the admin JSON API and the impersonation endpoints over a
//! GoTrue identity provider and a PostgREST data store. Browser sessions
//! live in signed cookies.

pub mod api;
pub mod api_response;
pub mod auth_middleware;
pub mod client_info;
pub mod cookies;
pub mod pagination;
pub mod routes;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use steward_server_config::ServerConfig;
