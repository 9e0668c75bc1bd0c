// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! [`auth_layer`] reads the signed session cookie, validates its access
//! token with the identity provider (refreshing it once when rejected) and
//! stores an [`AuthContext`] as a request extension. Handlers then use the
//! [`RequireAuth`] or [`OptionalAuth`] extractors.
//!
//! ```ignore
//! async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", user.user.id)
//! }
//! ```

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use steward_server_auth::{AuthUser, Session, UserId};
use tower_cookies::Cookies;
use tracing::instrument;

use crate::api::AppState;
use crate::api_response::{AdminErrorResponse, ApiErrorResponse};
use crate::cookies;

/// The signed-in user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
	pub session: Session,
	pub user: AuthUser,
}

impl CurrentUser {
	pub fn id(&self) -> &UserId {
		&self.user.id
	}
}

#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	pub current_user: Option<CurrentUser>,
}

impl AuthContext {
	pub fn authenticated(user: CurrentUser) -> Self {
		Self {
			current_user: Some(user),
		}
	}

	pub fn unauthenticated() -> Self {
		Self::default()
	}
}

/// Authentication middleware that extracts auth context from requests.
///
/// A refreshed session is written back to the cookie; a session the
/// provider no longer accepts is cleared.
#[instrument(
	name = "auth_layer",
	skip(state, cookies, request, next),
	fields(user_id = tracing::field::Empty)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	cookies: Cookies,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let ctx = match authenticate(&state, &cookies).await {
		Some(user) => {
			tracing::Span::current().record("user_id", tracing::field::display(user.id()));
			AuthContext::authenticated(user)
		}
		None => AuthContext::unauthenticated(),
	};
	request.extensions_mut().insert(ctx);
	next.run(request).await
}

async fn authenticate(state: &AppState, cookies: &Cookies) -> Option<CurrentUser> {
	let tokens = cookies::read_session(cookies, &state.cookie_key)?;

	match state.provider.get_user(tokens.access_token()).await {
		Ok(user) => {
			let session = Session::new(tokens, user.id.clone(), user.email.clone());
			Some(CurrentUser { session, user })
		}
		Err(e) if e.is_unauthorized() => match state.provider.set_session(&tokens).await {
			Ok(session) => {
				tracing::debug!(user_id = %session.user_id, "Refreshed session");
				cookies::write_session(cookies, &state.cookie_key, &state.session_config, &session.tokens);
				let user = AuthUser {
					id: session.user_id.clone(),
					email: session.user_email.clone(),
					created_at: None,
					last_sign_in_at: None,
				};
				Some(CurrentUser { session, user })
			}
			Err(e) => {
				tracing::debug!(error = %e, "Session no longer valid");
				cookies::clear_session(cookies, &state.session_config);
				None
			}
		},
		Err(e) => {
			tracing::warn!(error = %e, "Failed to validate session");
			None
		}
	}
}

fn auth_context(parts: &Parts) -> AuthContext {
	parts
		.extensions
		.get::<AuthContext>()
		.cloned()
		.unwrap_or_else(AuthContext::unauthenticated)
}

/// Extractor that rejects unauthenticated requests with 401.
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match auth_context(parts).current_user {
			Some(user) => Ok(RequireAuth(user)),
			None => {
				tracing::debug!("Authentication required: no valid session");
				let response = (
					StatusCode::UNAUTHORIZED,
					Json(AdminErrorResponse::new(
						"unauthorized",
						"Authentication required",
					)),
				);
				Err(response.into_response())
			}
		}
	}
}

/// Extractor for optional authentication. Always succeeds.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(OptionalAuth(auth_context(parts).current_user))
	}
}
