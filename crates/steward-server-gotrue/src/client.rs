// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GoTrue HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use steward_common_secret::SecretString;
use steward_server_auth::{AuthUser, Session, TokenPair, UserId};
use tracing::{debug, error, instrument, trace, warn};
use url::Url;

use crate::error::ProviderError;
use crate::provider::IdentityProvider;
use crate::types::{CreateUserRequest, GeneratedLink, LinkType};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a GoTrue-compatible identity API (`{project}/auth/v1`).
#[derive(Clone)]
pub struct GoTrueClient {
	http_client: Client,
	base_url: String,
	anon_key: SecretString,
	service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for GoTrueClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GoTrueClient")
			.field("base_url", &self.base_url)
			.field("has_service_role_key", &self.service_role_key.is_some())
			.finish()
	}
}

#[derive(Serialize)]
struct CreateUserBody<'a> {
	email: &'a str,
	password: &'a str,
	email_confirm: bool,
}

#[derive(Serialize)]
struct UpdateEmailBody<'a> {
	email: &'a str,
}

#[derive(Serialize)]
struct GenerateLinkBody<'a> {
	#[serde(rename = "type")]
	link_type: &'a str,
	email: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
	#[serde(rename = "type")]
	link_type: &'a str,
	token_hash: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh_token: &'a str,
}

#[derive(Serialize)]
struct PkceBody<'a> {
	auth_code: &'a str,
	code_verifier: &'a str,
}

#[derive(Deserialize)]
struct UserList {
	#[serde(default)]
	users: Vec<AuthUser>,
}

#[derive(Deserialize, Default)]
struct LinkProperties {
	#[serde(default)]
	action_link: Option<String>,
	#[serde(default)]
	hashed_token: Option<String>,
}

/// GoTrue returns link properties at the top level; some proxies nest them
/// under `properties`.
#[derive(Deserialize)]
struct GenerateLinkResponse {
	#[serde(flatten)]
	top: LinkProperties,
	#[serde(default)]
	properties: Option<LinkProperties>,
}

#[derive(Deserialize)]
struct SessionResponse {
	#[serde(default)]
	access_token: String,
	#[serde(default)]
	refresh_token: String,
	user: AuthUser,
}

impl SessionResponse {
	fn into_session(self) -> Result<Session, ProviderError> {
		let tokens = TokenPair::new(self.access_token, self.refresh_token).ok_or_else(|| {
			ProviderError::InvalidResponse("session is missing a token".to_string())
		})?;
		Ok(Session::new(tokens, self.user.id, self.user.email))
	}
}

impl GoTrueClient {
	/// Creates a client for the project at `project_url`.
	pub fn new(
		project_url: &str,
		anon_key: SecretString,
		service_role_key: Option<SecretString>,
	) -> Result<Self, ProviderError> {
		Self::with_timeout(project_url, anon_key, service_role_key, DEFAULT_TIMEOUT)
	}

	pub fn with_timeout(
		project_url: &str,
		anon_key: SecretString,
		service_role_key: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, ProviderError> {
		let http_client = steward_common_http::client_with_timeout(timeout)?;
		Ok(Self {
			http_client,
			base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
			anon_key,
			service_role_key,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// `/admin/users/{id}` with `id` escaped as a single path segment.
	fn admin_user_url(&self, id: &UserId) -> Result<Url, ProviderError> {
		if matches!(id.as_str(), "" | "." | "..") {
			return Err(ProviderError::NotFound);
		}
		let mut url =
			Url::parse(&self.base_url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
		url.path_segments_mut()
			.map_err(|_| ProviderError::InvalidUrl(self.base_url.clone()))?
			.pop_if_empty()
			.extend(["admin", "users", id.as_str()]);
		Ok(url)
	}

	fn admin(&self, builder: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
		let key = self
			.service_role_key
			.as_ref()
			.ok_or(ProviderError::MissingKey("service_role_key"))?;
		Ok(builder
			.header("apikey", key.expose())
			.bearer_auth(key.expose()))
	}

	fn public(&self, builder: RequestBuilder) -> RequestBuilder {
		builder.header("apikey", self.anon_key.expose())
	}

	async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
		builder.send().await.map_err(|e| {
			if e.is_timeout() {
				error!("Identity provider request timed out");
				return ProviderError::Timeout;
			}
			error!(error = %e, "Network error during identity provider request");
			ProviderError::Network(e)
		})
	}

	async fn check(response: Response) -> Result<Response, ProviderError> {
		let status = response.status();
		debug!(status = %status, "Received response from identity provider");
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		match status {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
				warn!(status = status.as_u16(), "Identity provider rejected credentials");
				Err(ProviderError::Unauthorized)
			}
			StatusCode::NOT_FOUND => Err(ProviderError::NotFound),
			_ => {
				error!(status = status.as_u16(), body = %body, "Identity provider error");
				Err(ProviderError::Rejected {
					status: status.as_u16(),
					message: body,
				})
			}
		}
	}

	async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
		let body = response.text().await?;
		trace!(len = body.len(), "Identity provider response body");
		serde_json::from_str(&body).map_err(|e| {
			error!(error = %e, "Failed to parse identity provider response");
			ProviderError::InvalidResponse(format!("JSON parse error: {e}"))
		})
	}

	async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ProviderError> {
		let response = Self::check(self.send(builder).await?).await?;
		Self::parse(response).await
	}

	async fn refresh(&self, refresh_token: &SecretString) -> Result<Session, ProviderError> {
		let request = self
			.public(
				self.http_client
					.post(self.url("/token"))
					.query(&[("grant_type", "refresh_token")]),
			)
			.json(&RefreshBody {
				refresh_token: refresh_token.expose(),
			});
		let response: SessionResponse = self.fetch(request).await?;
		response.into_session()
	}
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
	#[instrument(skip(self), fields(user_id = %id))]
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<AuthUser>, ProviderError> {
		let url = match self.admin_user_url(id) {
			Ok(url) => url,
			Err(ProviderError::NotFound) => return Ok(None),
			Err(e) => return Err(e),
		};
		let request = self.admin(self.http_client.get(url))?;
		match self.fetch(request).await {
			Ok(user) => Ok(Some(user)),
			Err(ProviderError::NotFound) => {
				debug!("user not found");
				Ok(None)
			}
			Err(e) => Err(e),
		}
	}

	#[instrument(skip(self))]
	async fn list_users(&self, page: u32, per_page: u32) -> Result<Vec<AuthUser>, ProviderError> {
		let request = self.admin(
			self.http_client
				.get(self.url("/admin/users"))
				.query(&[("page", page), ("per_page", per_page)]),
		)?;
		let list: UserList = self.fetch(request).await?;
		debug!(count = list.users.len(), "listed users");
		Ok(list.users)
	}

	#[instrument(skip(self, request), fields(email = %request.email))]
	async fn create_user(&self, request: &CreateUserRequest) -> Result<AuthUser, ProviderError> {
		let builder = self
			.admin(self.http_client.post(self.url("/admin/users")))?
			.json(&CreateUserBody {
				email: &request.email,
				password: request.password.expose(),
				email_confirm: request.email_confirm,
			});
		self.fetch(builder).await
	}

	#[instrument(skip(self, email), fields(user_id = %id))]
	async fn update_user_email(
		&self,
		id: &UserId,
		email: &str,
	) -> Result<AuthUser, ProviderError> {
		let builder = self
			.admin(self.http_client.put(self.admin_user_url(id)?))?
			.json(&UpdateEmailBody { email });
		self.fetch(builder).await
	}

	#[instrument(skip(self, email), fields(link_type = link_type.as_str()))]
	async fn generate_link(
		&self,
		link_type: LinkType,
		email: &str,
	) -> Result<GeneratedLink, ProviderError> {
		let builder = self
			.admin(self.http_client.post(self.url("/admin/generate_link")))?
			.json(&GenerateLinkBody {
				link_type: link_type.as_str(),
				email,
			});
		let response: GenerateLinkResponse = self.fetch(builder).await?;
		let nested = response.properties.unwrap_or_default();

		let action_link = response
			.top
			.action_link
			.or(nested.action_link)
			.filter(|l| !l.is_empty())
			.ok_or_else(|| ProviderError::InvalidResponse("missing action_link".to_string()))?;
		let hashed_token = response
			.top
			.hashed_token
			.or(nested.hashed_token)
			.filter(|t| !t.is_empty());

		debug!(has_hashed_token = hashed_token.is_some(), "generated link");
		Ok(GeneratedLink {
			action_link,
			hashed_token,
		})
	}

	#[instrument(skip(self, token_hash), fields(link_type = link_type.as_str()))]
	async fn verify_otp(
		&self,
		token_hash: &str,
		link_type: LinkType,
	) -> Result<Session, ProviderError> {
		let builder = self
			.public(self.http_client.post(self.url("/verify")))
			.json(&VerifyBody {
				link_type: link_type.as_str(),
				token_hash,
			});
		let response: SessionResponse = self.fetch(builder).await?;
		response.into_session()
	}

	#[instrument(skip(self, tokens))]
	async fn set_session(&self, tokens: &TokenPair) -> Result<Session, ProviderError> {
		match self.get_user(tokens.access_token()).await {
			Ok(user) => Ok(Session::new(tokens.clone(), user.id, user.email)),
			Err(ProviderError::Unauthorized) => {
				debug!("access token rejected, refreshing");
				self.refresh(tokens.refresh_token()).await
			}
			Err(e) => Err(e),
		}
	}

	#[instrument(skip(self, access_token))]
	async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, ProviderError> {
		let builder = self
			.public(self.http_client.get(self.url("/user")))
			.bearer_auth(access_token.expose());
		self.fetch(builder).await
	}

	#[instrument(skip(self, code, code_verifier))]
	async fn exchange_code_for_session(
		&self,
		code: &str,
		code_verifier: &str,
	) -> Result<Session, ProviderError> {
		let builder = self
			.public(
				self.http_client
					.post(self.url("/token"))
					.query(&[("grant_type", "pkce")]),
			)
			.json(&PkceBody {
				auth_code: code,
				code_verifier,
			});
		let response: SessionResponse = self.fetch(builder).await?;
		response.into_session()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_url_appends_auth_prefix() {
		let client =
			GoTrueClient::new("https://project.example.co/", SecretString::from("anon"), None)
				.unwrap();
		assert_eq!(client.base_url(), "https://project.example.co/auth/v1");
	}

	#[test]
	fn debug_hides_keys() {
		let client = GoTrueClient::new(
			"https://project.example.co",
			SecretString::from("anon-key-value"),
			Some(SecretString::from("service-key-value")),
		)
		.unwrap();
		let debug = format!("{client:?}");
		assert!(!debug.contains("anon-key-value"));
		assert!(!debug.contains("service-key-value"));
	}

	#[tokio::test]
	async fn admin_call_without_service_key_fails_fast() {
		let client =
			GoTrueClient::new("http://127.0.0.1:9", SecretString::from("anon"), None).unwrap();
		let err = client
			.get_user_by_id(&UserId::new("u1"))
			.await
			.unwrap_err();
		assert!(matches!(err, ProviderError::MissingKey("service_role_key")));
	}
}
