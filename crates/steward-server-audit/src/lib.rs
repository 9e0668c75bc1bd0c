// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit trail for administrative actions.
//!
//! Entries are built with [`AuditLogBuilder`] and handed to
//! [`AuditService::record`], which fans them out to the configured sinks in
//! order. Callers treat a failed record as a warning, never as a reason to
//! abort the action being audited.

pub mod error;
pub mod event;
pub mod service;
pub mod sink;

pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::{AuditAction, AuditLogBuilder, AuditLogEntry};
pub use service::AuditService;
pub use sink::store::StoreAuditSink;
pub use sink::tracing::TracingAuditSink;
pub use sink::AuditSink;

pub use steward_server_config::AuditConfig;
