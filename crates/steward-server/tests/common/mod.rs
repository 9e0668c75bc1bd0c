// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared setup for router tests: an app wired to in-memory backends and a
//! minimal browser cookie jar.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
	body::Body,
	http::{header, Method, Request, Response, StatusCode},
	Router,
};
use serde_json::{json, Value};
use steward_server::{create_app_state, create_router, ServerConfig};
use steward_server_db::testing::MemoryStore;
use steward_server_gotrue::testing::FakeIdentityProvider;
use tower::ServiceExt;
use tower_cookies::Key;

pub const ADMIN_ID: &str = "admin-1";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const MEMBER_ID: &str = "user-9";
pub const MEMBER_EMAIL: &str = "uma@example.com";

pub struct TestApp {
	pub app: Router,
	pub provider: Arc<FakeIdentityProvider>,
	pub store: Arc<MemoryStore>,
}

pub fn setup() -> TestApp {
	setup_with_config(ServerConfig::default())
}

pub fn setup_with_config(config: ServerConfig) -> TestApp {
	let provider = Arc::new(FakeIdentityProvider::new());
	provider.add_user(ADMIN_ID, Some(ADMIN_EMAIL));
	provider.add_user(MEMBER_ID, Some(MEMBER_EMAIL));

	let store = Arc::new(MemoryStore::new());
	store.seed(
		"roles",
		vec![
			json!({"id": 1, "name": "admin", "colour": "#FF0000"}),
			json!({"id": 2, "name": "member", "colour": "#00AA00"}),
		],
	);
	store.seed(
		"profiles",
		vec![
			json!({"id": ADMIN_ID, "full_name": "Ada Admin", "company_name": "Steward", "role_id": 1}),
			json!({"id": MEMBER_ID, "full_name": "Uma User", "company_name": null, "role_id": 2}),
		],
	);

	let state = create_app_state(&config, provider.clone(), store.clone(), Key::generate());
	TestApp {
		app: create_router(state),
		provider,
		store,
	}
}

/// Cookies the "browser" currently holds, as `name -> name=value`.
#[derive(Debug, Default, Clone)]
pub struct Jar {
	cookies: BTreeMap<String, String>,
}

impl Jar {
	pub fn absorb<B>(&mut self, response: &Response<B>) {
		for value in response.headers().get_all(header::SET_COOKIE) {
			let raw = value.to_str().unwrap();
			let pair = raw.split(';').next().unwrap().trim().to_string();
			let name = pair.split('=').next().unwrap().to_string();
			if raw.contains("Max-Age=0") {
				self.cookies.remove(&name);
			} else {
				self.cookies.insert(name, pair);
			}
		}
	}

	pub fn has(&self, name: &str) -> bool {
		self.cookies.contains_key(name)
	}

	pub fn header(&self) -> Option<String> {
		if self.cookies.is_empty() {
			None
		} else {
			Some(self.cookies.values().cloned().collect::<Vec<_>>().join("; "))
		}
	}
}

/// Every `Set-Cookie` header whose cookie is `name`.
pub fn set_cookies<B>(response: &Response<B>, name: &str) -> Vec<String> {
	let prefix = format!("{name}=");
	response
		.headers()
		.get_all(header::SET_COOKIE)
		.iter()
		.map(|v| v.to_str().unwrap().to_string())
		.filter(|v| v.starts_with(&prefix))
		.collect()
}

pub fn location<B>(response: &Response<B>) -> String {
	response
		.headers()
		.get(header::LOCATION)
		.expect("redirect has a location")
		.to_str()
		.unwrap()
		.to_string()
}

impl TestApp {
	pub async fn send(
		&self,
		jar: &mut Jar,
		method: Method,
		uri: &str,
		body: Option<Value>,
	) -> Response<Body> {
		let mut builder = Request::builder().method(method).uri(uri);
		if let Some(cookie) = jar.header() {
			builder = builder.header(header::COOKIE, cookie);
		}
		let request = match body {
			Some(body) => builder
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};
		let response = self.app.clone().oneshot(request).await.unwrap();
		jar.absorb(&response);
		response
	}

	/// Signs `user_id` in through the callback and returns the browser jar.
	pub async fn sign_in(&self, user_id: &str) -> Jar {
		let session = self.provider.sign_in(user_id);
		let query = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("access_token", session.tokens.access_token().expose())
			.append_pair("refresh_token", session.tokens.refresh_token().expose())
			.finish();
		let mut jar = Jar::default();
		let response = self
			.send(&mut jar, Method::GET, &format!("/auth/callback?{query}"), None)
			.await;
		assert_eq!(response.status(), StatusCode::SEE_OTHER);
		assert!(jar.has("steward_session"));
		jar
	}
}

pub async fn json_body(response: Response<Body>) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

pub fn audit_actions(store: &MemoryStore) -> Vec<String> {
	store
		.rows("logs")
		.iter()
		.map(|row| row["action"].as_str().unwrap_or_default().to_string())
		.collect()
}
