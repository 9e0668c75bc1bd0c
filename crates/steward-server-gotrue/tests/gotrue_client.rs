// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use serde_json::json;
use steward_common_secret::SecretString;
use steward_server_auth::{TokenPair, UserId};
use steward_server_gotrue::{
	CreateUserRequest, GoTrueClient, IdentityProvider, LinkType, ProviderError,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GoTrueClient {
	GoTrueClient::new(
		&server.uri(),
		SecretString::from("anon-key"),
		Some(SecretString::from("service-key")),
	)
	.unwrap()
}

fn user_json(id: &str, email: &str) -> serde_json::Value {
	json!({
		"id": id,
		"aud": "authenticated",
		"role": "authenticated",
		"email": email,
		"created_at": "2024-01-01T00:00:00Z",
		"last_sign_in_at": "2024-05-01T12:00:00Z"
	})
}

fn session_json(id: &str, access: &str, refresh: &str) -> serde_json::Value {
	json!({
		"access_token": access,
		"token_type": "bearer",
		"expires_in": 3600,
		"refresh_token": refresh,
		"user": user_json(id, "user@example.com")
	})
}

#[tokio::test]
async fn get_user_by_id_uses_service_role_key() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/admin/users/u1"))
		.and(header("apikey", "service-key"))
		.and(header("authorization", "Bearer service-key"))
		.respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "u1@example.com")))
		.expect(1)
		.mount(&server)
		.await;

	let user = client(&server)
		.get_user_by_id(&UserId::new("u1"))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(user.email.as_deref(), Some("u1@example.com"));
	assert!(user.last_sign_in_at.is_some());
}

#[tokio::test]
async fn user_id_stays_inside_the_users_path() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/admin/users/..%2F..%2Frest%2Fv1%2Fsecrets%3Fx="))
		.respond_with(ResponseTemplate::new(404).set_body_json(json!({"msg": "User not found"})))
		.expect(1)
		.mount(&server)
		.await;

	let user = client(&server)
		.get_user_by_id(&UserId::new("../../rest/v1/secrets?x="))
		.await
		.unwrap();
	assert!(user.is_none());

	let received = server.received_requests().await.unwrap();
	assert_eq!(received.len(), 1);
	assert!(received[0].url.query().is_none());
}

#[tokio::test]
async fn dot_segment_ids_never_reach_the_server() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
		.expect(0)
		.mount(&server)
		.await;
	Mock::given(method("PUT"))
		.respond_with(ResponseTemplate::new(200))
		.expect(0)
		.mount(&server)
		.await;

	let gotrue = client(&server);
	assert!(gotrue.get_user_by_id(&UserId::new("..")).await.unwrap().is_none());
	let err = gotrue
		.update_user_email(&UserId::new(".."), "x@example.com")
		.await
		.unwrap_err();
	assert!(matches!(err, ProviderError::NotFound));
}

#[tokio::test]
async fn update_user_email_escapes_the_id() {
	let server = MockServer::start().await;
	Mock::given(method("PUT"))
		.and(path("/auth/v1/admin/users/a%2Fb"))
		.and(body_json(json!({"email": "new@example.com"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(user_json("a/b", "new@example.com")))
		.expect(1)
		.mount(&server)
		.await;

	let user = client(&server)
		.update_user_email(&UserId::new("a/b"), "new@example.com")
		.await
		.unwrap();
	assert_eq!(user.email.as_deref(), Some("new@example.com"));
}

#[tokio::test]
async fn get_user_by_id_maps_404_to_none() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/admin/users/missing"))
		.respond_with(ResponseTemplate::new(404).set_body_json(json!({"msg": "User not found"})))
		.mount(&server)
		.await;

	let user = client(&server)
		.get_user_by_id(&UserId::new("missing"))
		.await
		.unwrap();
	assert!(user.is_none());
}

#[tokio::test]
async fn server_error_is_rejected() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/admin/users/u1"))
		.respond_with(ResponseTemplate::new(500).set_body_string("boom"))
		.mount(&server)
		.await;

	let err = client(&server)
		.get_user_by_id(&UserId::new("u1"))
		.await
		.unwrap_err();
	assert!(matches!(err, ProviderError::Rejected { status: 500, .. }));
}

#[tokio::test]
async fn generate_link_reads_top_level_properties() {
	let server = MockServer::start().await;
	let mut body = user_json("u1", "u1@example.com");
	body["action_link"] = json!("https://project.test/auth/v1/verify?token=abc&type=magiclink");
	body["hashed_token"] = json!("abc");
	body["verification_type"] = json!("magiclink");

	Mock::given(method("POST"))
		.and(path("/auth/v1/admin/generate_link"))
		.and(body_json(json!({"type": "magiclink", "email": "u1@example.com"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(body))
		.mount(&server)
		.await;

	let link = client(&server)
		.generate_link(LinkType::Magiclink, "u1@example.com")
		.await
		.unwrap();
	assert!(link.action_link.starts_with("https://project.test/auth/v1/verify"));
	assert_eq!(link.hashed_token.as_deref(), Some("abc"));
}

#[tokio::test]
async fn generate_link_reads_nested_properties() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/admin/generate_link"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"properties": {"action_link": "https://x.test/#access_token=a&refresh_token=r"},
			"user": user_json("u1", "u1@example.com")
		})))
		.mount(&server)
		.await;

	let link = client(&server)
		.generate_link(LinkType::Magiclink, "u1@example.com")
		.await
		.unwrap();
	assert!(link.action_link.contains("#access_token=a"));
	assert!(link.hashed_token.is_none());
}

#[tokio::test]
async fn verify_otp_returns_session() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/verify"))
		.and(header("apikey", "anon-key"))
		.and(body_json(json!({"type": "magiclink", "token_hash": "abc"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(session_json("u1", "at", "rt")))
		.mount(&server)
		.await;

	let session = client(&server)
		.verify_otp("abc", LinkType::Magiclink)
		.await
		.unwrap();
	assert_eq!(session.user_id.as_str(), "u1");
	assert_eq!(session.tokens.access_token().expose(), "at");
	assert_eq!(session.tokens.refresh_token().expose(), "rt");
}

#[tokio::test]
async fn verify_otp_rejects_session_without_refresh_token() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/verify"))
		.respond_with(ResponseTemplate::new(200).set_body_json(session_json("u1", "at", "")))
		.mount(&server)
		.await;

	let err = client(&server)
		.verify_otp("abc", LinkType::Magiclink)
		.await
		.unwrap_err();
	assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn set_session_keeps_valid_tokens() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/user"))
		.and(header("authorization", "Bearer good-access"))
		.respond_with(ResponseTemplate::new(200).set_body_json(user_json("a1", "admin@example.com")))
		.mount(&server)
		.await;

	let tokens = TokenPair::new("good-access", "good-refresh").unwrap();
	let session = client(&server).set_session(&tokens).await.unwrap();
	assert_eq!(session.tokens, tokens);
	assert_eq!(session.user_email.as_deref(), Some("admin@example.com"));
}

#[tokio::test]
async fn set_session_refreshes_expired_access_token() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/user"))
		.respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/token"))
		.and(query_param("grant_type", "refresh_token"))
		.and(body_json(json!({"refresh_token": "old-refresh"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(session_json(
			"a1",
			"new-access",
			"new-refresh",
		)))
		.expect(1)
		.mount(&server)
		.await;

	let tokens = TokenPair::new("old-access", "old-refresh").unwrap();
	let session = client(&server).set_session(&tokens).await.unwrap();
	assert_eq!(session.tokens.access_token().expose(), "new-access");
}

#[tokio::test]
async fn exchange_code_uses_pkce_grant() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/token"))
		.and(query_param("grant_type", "pkce"))
		.and(body_json(json!({"auth_code": "code-1", "code_verifier": "verifier-1"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(session_json("u1", "at", "rt")))
		.mount(&server)
		.await;

	let session = client(&server)
		.exchange_code_for_session("code-1", "verifier-1")
		.await
		.unwrap();
	assert_eq!(session.user_id.as_str(), "u1");
}

#[tokio::test]
async fn create_and_update_user() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/auth/v1/admin/users"))
		.and(body_json(json!({
			"email": "new@example.com",
			"password": "hunter22",
			"email_confirm": true
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(user_json("n1", "new@example.com")))
		.mount(&server)
		.await;
	Mock::given(method("PUT"))
		.and(path("/auth/v1/admin/users/n1"))
		.and(body_json(json!({"email": "renamed@example.com"})))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(user_json("n1", "renamed@example.com")),
		)
		.mount(&server)
		.await;

	let gotrue = client(&server);
	let created = gotrue
		.create_user(&CreateUserRequest {
			email: "new@example.com".to_string(),
			password: SecretString::from("hunter22"),
			email_confirm: true,
		})
		.await
		.unwrap();
	let updated = gotrue
		.update_user_email(&created.id, "renamed@example.com")
		.await
		.unwrap();
	assert_eq!(updated.email.as_deref(), Some("renamed@example.com"));
}

#[tokio::test]
async fn list_users_passes_paging() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/admin/users"))
		.and(query_param("page", "2"))
		.and(query_param("per_page", "10"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"users": [user_json("u1", "a@example.com"), user_json("u2", "b@example.com")],
			"aud": "authenticated"
		})))
		.mount(&server)
		.await;

	let users = client(&server).list_users(2, 10).await.unwrap();
	assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn slow_provider_times_out() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/auth/v1/user"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(user_json("u1", "u1@example.com"))
				.set_delay(Duration::from_secs(2)),
		)
		.mount(&server)
		.await;

	let gotrue = GoTrueClient::with_timeout(
		&server.uri(),
		SecretString::from("anon-key"),
		None,
		Duration::from_millis(100),
	)
	.unwrap();
	let err = gotrue
		.get_user(&SecretString::from("token"))
		.await
		.unwrap_err();
	assert!(matches!(err, ProviderError::Timeout));
}
