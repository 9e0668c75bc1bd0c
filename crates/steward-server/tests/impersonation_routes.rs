// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Router tests for the impersonation endpoints and the sign-in callback.

mod common;

use axum::http::{Method, StatusCode};
use common::{
	audit_actions, json_body, location, set_cookies, setup, setup_with_config, Jar, ADMIN_EMAIL,
	ADMIN_ID, MEMBER_ID,
};
use steward_server::ServerConfig;

// ============================================================================
// Full round trip
// ============================================================================

#[tokio::test]
async fn admin_impersonates_member_and_returns() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;

	let response = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{MEMBER_ID}/impersonate"),
			None,
		)
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	let callback = location(&response);
	assert!(callback.starts_with("/auth/callback?access_token="));
	assert!(callback.contains("&refresh_token="));
	assert!(callback.ends_with("&next=/app"));

	let stash = set_cookies(&response, "original_session");
	assert_eq!(stash.len(), 1);
	let stash = &stash[0];
	assert!(stash.contains("HttpOnly"));
	assert!(stash.contains("SameSite=Lax"));
	assert!(stash.contains("Path=/"));
	assert!(stash.contains("Max-Age=86400"));
	assert_eq!(audit_actions(&t.store), vec!["impersonate_user"]);
	assert_eq!(t.store.rows("logs")[0]["entity_id"], MEMBER_ID);

	// The browser follows the hand-off and becomes the member.
	let response = t.send(&mut jar, Method::GET, &callback, None).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/app");

	let response = t
		.send(&mut jar, Method::GET, "/app/impersonation", None)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let state = json_body(response).await;
	assert_eq!(state["is_impersonating"], true);
	assert_eq!(state["original_user_email"], ADMIN_EMAIL);

	let response = t
		.send(&mut jar, Method::POST, "/app/impersonation/stop", None)
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/app/users");
	let cleared = set_cookies(&response, "original_session");
	assert_eq!(cleared.len(), 1);
	assert!(cleared[0].contains("Max-Age=0"));
	assert!(!jar.has("original_session"));
	assert_eq!(
		audit_actions(&t.store),
		vec!["impersonate_user", "stop_impersonation"]
	);
	assert_eq!(t.store.rows("logs")[1]["entity_id"], MEMBER_ID);

	// Back as the admin.
	let response = t
		.send(&mut jar, Method::GET, "/api/admin/users", None)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await["current_user_id"], ADMIN_ID);

	let response = t
		.send(&mut jar, Method::GET, "/app/impersonation", None)
		.await;
	let state = json_body(response).await;
	assert_eq!(state["is_impersonating"], false);
	assert!(state["original_user_email"].is_null());
}

// ============================================================================
// Start failures
// ============================================================================

#[tokio::test]
async fn impersonate_without_session_returns_401() {
	let t = setup();
	let mut jar = Jar::default();

	let response = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{MEMBER_ID}/impersonate"),
			None,
		)
		.await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert!(set_cookies(&response, "original_session").is_empty());
	assert_eq!(json_body(response).await["error"], "unauthorized");
	assert_eq!(t.provider.call_count("get_user_by_id"), 0);
}

#[tokio::test]
async fn member_cannot_impersonate() {
	let t = setup();
	let mut jar = t.sign_in(MEMBER_ID).await;

	let response = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{ADMIN_ID}/impersonate"),
			None,
		)
		.await;

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert!(!jar.has("original_session"));
	assert_eq!(json_body(response).await["error"], "forbidden");
	assert!(audit_actions(&t.store).is_empty());
}

#[tokio::test]
async fn self_impersonation_is_rejected_with_field() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;

	let response = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{ADMIN_ID}/impersonate"),
			None,
		)
		.await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(!jar.has("original_session"));
	let body = json_body(response).await;
	assert_eq!(body["message"], "Cannot impersonate yourself");
	assert_eq!(body["error_fields"][0], "user_id");
	assert_eq!(t.provider.call_count("generate_link"), 0);
}

#[tokio::test]
async fn unknown_target_returns_404() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;

	let response = t
		.send(&mut jar, Method::POST, "/app/users/ghost/impersonate", None)
		.await;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert!(!jar.has("original_session"));
	assert_eq!(json_body(response).await["message"], "User not found");
	assert!(audit_actions(&t.store).is_empty());
}

#[tokio::test]
async fn second_start_with_stash_present_conflicts() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;
	let uri = format!("/app/users/{MEMBER_ID}/impersonate");

	let first = t.send(&mut jar, Method::POST, &uri, None).await;
	assert_eq!(first.status(), StatusCode::SEE_OTHER);

	let second = t.send(&mut jar, Method::POST, &uri, None).await;
	assert_eq!(second.status(), StatusCode::CONFLICT);
	assert_eq!(json_body(second).await["error"], "conflict");
	assert_eq!(audit_actions(&t.store), vec!["impersonate_user"]);
}

#[tokio::test]
async fn link_failure_maps_to_500() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;
	t.provider.fail("generate_link");

	let response = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{MEMBER_ID}/impersonate"),
			None,
		)
		.await;

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert!(!jar.has("original_session"));
	assert_eq!(json_body(response).await["error"], "upstream_error");
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test]
async fn stop_without_stash_returns_404() {
	let t = setup();
	let mut jar = t.sign_in(ADMIN_ID).await;

	let response = t
		.send(&mut jar, Method::POST, "/app/impersonation/stop", None)
		.await;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(
		json_body(response).await["message"],
		"No original session found"
	);
	assert_eq!(t.provider.call_count("set_session"), 1);
}

#[tokio::test]
async fn stop_uses_configured_return_path() {
	let mut config = ServerConfig::default();
	config.impersonation.return_path = "/account/users".to_string();
	let t = setup_with_config(config);
	let mut jar = t.sign_in(ADMIN_ID).await;

	let start = t
		.send(
			&mut jar,
			Method::POST,
			&format!("/app/users/{MEMBER_ID}/impersonate"),
			None,
		)
		.await;
	assert_eq!(start.status(), StatusCode::SEE_OTHER);

	let response = t
		.send(&mut jar, Method::POST, "/app/impersonation/stop", None)
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/account/users");
}

// ============================================================================
// Callback
// ============================================================================

#[tokio::test]
async fn callback_ignores_offsite_next() {
	let t = setup();
	let session = t.provider.sign_in(ADMIN_ID);
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("access_token", session.tokens.access_token().expose())
		.append_pair("refresh_token", session.tokens.refresh_token().expose())
		.append_pair("next", "//evil.example/steal")
		.finish();
	let mut jar = Jar::default();

	let response = t
		.send(&mut jar, Method::GET, &format!("/auth/callback?{query}"), None)
		.await;

	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/account");
	let cookie = set_cookies(&response, "steward_session");
	assert_eq!(cookie.len(), 1);
	assert!(cookie[0].contains("HttpOnly"));
	assert!(cookie[0].contains("SameSite=Lax"));
	assert!(cookie[0].contains("Path=/"));
	assert!(cookie[0].contains("Max-Age=604800"));
}

#[tokio::test]
async fn callback_with_rejected_tokens_goes_to_sign_in() {
	let t = setup();
	let mut jar = Jar::default();

	let response = t
		.send(
			&mut jar,
			Method::GET,
			"/auth/callback?access_token=bogus&refresh_token=bogus",
			None,
		)
		.await;

	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/sign_in");
	assert!(!jar.has("steward_session"));
}

#[tokio::test]
async fn callback_without_credentials_goes_to_sign_in() {
	let t = setup();
	let mut jar = Jar::default();

	for uri in ["/auth/callback", "/auth/callback?access_token=only", "/auth/callback?code=abc"] {
		let response = t.send(&mut jar, Method::GET, uri, None).await;
		assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
		assert_eq!(location(&response), "/sign_in", "{uri}");
	}
	assert_eq!(t.provider.call_count("exchange_code_for_session"), 0);
	assert_eq!(t.provider.call_count("set_session"), 0);
}
