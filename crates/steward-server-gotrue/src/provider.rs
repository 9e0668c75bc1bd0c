// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use steward_common_secret::SecretString;
use steward_server_auth::{AuthUser, Session, TokenPair, UserId};

use crate::error::ProviderError;
use crate::types::{CreateUserRequest, GeneratedLink, LinkType};

/// Operations Steward needs from the external identity provider.
///
/// Admin operations (`get_user_by_id`, `list_users`, `create_user`,
/// `update_user_email`, `generate_link`) run with elevated credentials; the
/// rest act on behalf of a user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Looks up an account. `Ok(None)` when it does not exist.
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<AuthUser>, ProviderError>;

	async fn list_users(&self, page: u32, per_page: u32) -> Result<Vec<AuthUser>, ProviderError>;

	async fn create_user(&self, request: &CreateUserRequest) -> Result<AuthUser, ProviderError>;

	async fn update_user_email(&self, id: &UserId, email: &str)
		-> Result<AuthUser, ProviderError>;

	async fn generate_link(
		&self,
		link_type: LinkType,
		email: &str,
	) -> Result<GeneratedLink, ProviderError>;

	/// Exchanges a hashed one-time token for a session.
	async fn verify_otp(&self, token_hash: &str, link_type: LinkType)
		-> Result<Session, ProviderError>;

	/// Establishes a session from a token pair, refreshing it if the access
	/// token is no longer accepted.
	async fn set_session(&self, tokens: &TokenPair) -> Result<Session, ProviderError>;

	/// Resolves the account an access token belongs to.
	async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, ProviderError>;

	/// Completes a PKCE sign-in.
	async fn exchange_code_for_session(
		&self,
		code: &str,
		code_verifier: &str,
	) -> Result<Session, ProviderError>;
}
