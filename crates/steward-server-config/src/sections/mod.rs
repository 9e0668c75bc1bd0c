// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for steward-server.

pub mod audit;
pub mod backend;
pub mod http;
pub mod impersonation;
pub mod logging;
pub mod session;

pub use audit::{AuditConfig, AuditConfigLayer};
pub use backend::{BackendConfig, BackendConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use impersonation::{ImpersonationConfig, ImpersonationConfigLayer, StashPolicy};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use session::{SessionConfig, SessionConfigLayer, MIN_COOKIE_SECRET_LEN};
