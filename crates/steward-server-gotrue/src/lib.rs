// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identity provider access for Steward.
//!
//! [`IdentityProvider`] is the seam the rest of the server talks to;
//! [`GoTrueClient`] implements it against a GoTrue-compatible `/auth/v1`
//! API. With the `testing` feature an in-memory [`testing::FakeIdentityProvider`]
//! is also available.

pub mod client;
pub mod error;
pub mod provider;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use client::GoTrueClient;
pub use error::ProviderError;
pub use provider::IdentityProvider;
pub use types::{CreateUserRequest, GeneratedLink, LinkType};
