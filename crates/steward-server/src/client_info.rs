// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Client address extraction for audit entries.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

/// Best-effort client IP: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the socket peer address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
	pub fn as_deref(&self) -> Option<&str> {
		self.0.as_deref()
	}
}

fn header_ip(headers: &HeaderMap) -> Option<String> {
	let forwarded = headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|v| !v.is_empty());
	let real = || {
		headers
			.get("x-real-ip")
			.and_then(|v| v.to_str().ok())
			.map(str::trim)
			.filter(|v| !v.is_empty())
	};
	forwarded.or_else(real).map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let ip = header_ip(&parts.headers).or_else(|| {
			parts
				.extensions
				.get::<ConnectInfo<SocketAddr>>()
				.map(|ConnectInfo(addr)| addr.ip().to_string())
		});
		Ok(ClientIp(ip))
	}
}
