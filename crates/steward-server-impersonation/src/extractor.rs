// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token pair extraction from a generated sign-in link.
//!
//! Strategies run in [`STRATEGIES`] order and the first complete pair wins.
//! Halves found by different strategies are never combined.

use std::borrow::Cow;

use steward_server_auth::TokenPair;
use steward_server_gotrue::{GeneratedLink, IdentityProvider, LinkType, ProviderError};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ExtractionError {
	#[error("link did not yield both an access and a refresh token")]
	IncompleteTokens,

	#[error("one-time token verification failed: {0}")]
	Upstream(#[from] ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
	/// `?access_token=..&refresh_token=..`
	Query,
	/// `#access_token=..&refresh_token=..`
	Fragment,
	/// Exchange the link's hashed token for a session.
	VerifyOtp,
}

pub const STRATEGIES: [Strategy; 3] = [Strategy::Query, Strategy::Fragment, Strategy::VerifyOtp];

fn pair_from<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Option<TokenPair> {
	let mut access = None;
	let mut refresh = None;
	for (key, value) in pairs {
		match key.as_ref() {
			"access_token" => access = Some(value.into_owned()),
			"refresh_token" => refresh = Some(value.into_owned()),
			_ => {}
		}
	}
	TokenPair::from_parts(access, refresh)
}

pub fn from_query(url: &Url) -> Option<TokenPair> {
	pair_from(url.query_pairs())
}

pub fn from_fragment(url: &Url) -> Option<TokenPair> {
	pair_from(url::form_urlencoded::parse(url.fragment()?.as_bytes()))
}

/// Runs the strategy chain against `link`.
///
/// The only network call is the OTP verification, and only when the URL
/// strategies found nothing.
pub async fn extract_tokens(
	provider: &dyn IdentityProvider,
	link: &GeneratedLink,
) -> Result<TokenPair, ExtractionError> {
	let url = match Url::parse(&link.action_link) {
		Ok(url) => Some(url),
		Err(e) => {
			warn!(error = %e, "action link is not a valid URL; skipping URL strategies");
			None
		}
	};

	for strategy in STRATEGIES {
		let found = match strategy {
			Strategy::Query => url.as_ref().and_then(from_query),
			Strategy::Fragment => url.as_ref().and_then(from_fragment),
			Strategy::VerifyOtp => match link.hashed_token.as_deref().filter(|h| !h.is_empty()) {
				Some(hash) => {
					let session = provider.verify_otp(hash, LinkType::Magiclink).await?;
					Some(session.tokens)
				}
				None => None,
			},
		};
		if let Some(tokens) = found {
			debug!(?strategy, "extracted token pair");
			return Ok(tokens);
		}
	}

	Err(ExtractionError::IncompleteTokens)
}
