// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post, put},
	Router,
};
use steward_server_audit::AuditService;
use steward_server_auth::{has_any_role, NamedRole};
use steward_server_config::{ImpersonationConfig, ServerConfig, SessionConfig};
use steward_server_db::{
	DataStore, LogRepository, ProfileRepository, RoleRepository, SettingsRepository,
};
use steward_server_gotrue::IdentityProvider;
use steward_server_impersonation::ImpersonationService;
use tower_cookies::{CookieManagerLayer, Cookies, Key};
use tower_http::trace::TraceLayer;

use crate::auth_middleware::auth_layer;
use crate::cookies::CookieStash;
use crate::routes;

#[derive(Clone)]
pub struct AppState {
	pub provider: Arc<dyn IdentityProvider>,
	pub profiles: ProfileRepository,
	pub roles: RoleRepository,
	pub settings: SettingsRepository,
	pub logs: LogRepository,
	pub audit_service: AuditService,
	pub impersonation: Arc<ImpersonationService>,
	pub cookie_key: Key,
	pub session_config: SessionConfig,
	pub impersonation_config: ImpersonationConfig,
}

impl AppState {
	/// The stashed-session cookie for this request's browser.
	pub fn stash(&self, cookies: Cookies) -> CookieStash {
		CookieStash::new(
			cookies,
			self.cookie_key.clone(),
			self.session_config.secure_cookies,
		)
	}

	/// Whether `role` may use the admin-only endpoints.
	pub fn is_admin<R: NamedRole>(&self, role: Option<&R>) -> bool {
		has_any_role(role, &self.impersonation_config.admin_roles)
	}
}

/// Builds the shared state from configuration and the two backend clients.
pub fn create_app_state(
	config: &ServerConfig,
	provider: Arc<dyn IdentityProvider>,
	store: Arc<dyn DataStore>,
	cookie_key: Key,
) -> AppState {
	let logs = LogRepository::new(store.clone());
	let audit_service = AuditService::from_config(&config.audit, logs.clone());
	tracing::info!(sinks = ?audit_service.sink_names(), "Audit sinks configured");

	let impersonation = ImpersonationService::new(
		provider.clone(),
		store.clone(),
		audit_service.clone(),
		config.impersonation.clone(),
	);

	AppState {
		provider,
		profiles: ProfileRepository::new(store.clone()),
		roles: RoleRepository::new(store.clone()),
		settings: SettingsRepository::new(store),
		logs,
		audit_service,
		impersonation: Arc::new(impersonation),
		cookie_key,
		session_config: config.session.clone(),
		impersonation_config: config.impersonation.clone(),
	}
}

pub fn create_router(state: AppState) -> Router {
	let callback_path = state.impersonation_config.callback_path.clone();

	Router::new()
		.route("/health", get(routes::health::health_check))
		.route(&callback_path, get(routes::auth::callback))
		.route("/api/site", get(routes::site::get_site))
		.route("/api/me", get(routes::me::get_me))
		// Impersonation
		.route(
			"/app/users/{id}/impersonate",
			post(routes::impersonation::start_impersonation),
		)
		.route(
			"/app/impersonation/stop",
			post(routes::impersonation::stop_impersonation),
		)
		.route(
			"/app/impersonation",
			get(routes::impersonation::impersonation_state),
		)
		// Admin API
		.route(
			"/api/admin/users",
			get(routes::admin_users::list_users).post(routes::admin_users::create_user),
		)
		.route(
			"/api/admin/users/{id}",
			put(routes::admin_users::update_user),
		)
		.route("/api/admin/roles", get(routes::admin_roles::list_roles))
		.route(
			"/api/admin/roles/{id}/colour",
			put(routes::admin_roles::update_role_colour),
		)
		.route(
			"/api/admin/settings",
			get(routes::admin_settings::list_settings).post(routes::admin_settings::create_setting),
		)
		.route(
			"/api/admin/settings/{id}",
			put(routes::admin_settings::update_setting)
				.delete(routes::admin_settings::delete_setting),
		)
		.route("/api/admin/logs", get(routes::admin_logs::list_logs))
		.layer(from_fn_with_state(state.clone(), auth_layer))
		.layer(CookieManagerLayer::new())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
