// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use steward_server_config::AuditConfig;
use steward_server_db::LogRepository;
use tracing::{debug, instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditLogEntry;
use crate::sink::store::StoreAuditSink;
use crate::sink::tracing::TracingAuditSink;
use crate::sink::AuditSink;

/// Publishes audit entries to every configured sink, in order.
#[derive(Clone)]
pub struct AuditService {
	sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditService {
	pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		Self { sinks }
	}

	/// A service that drops every entry.
	pub fn disabled() -> Self {
		Self { sinks: Vec::new() }
	}

	pub fn from_config(config: &AuditConfig, logs: LogRepository) -> Self {
		if !config.enabled {
			return Self::disabled();
		}
		let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
		if config.tracing_sink {
			sinks.push(Arc::new(TracingAuditSink::new()));
		}
		if config.store_sink {
			sinks.push(Arc::new(StoreAuditSink::new(logs)));
		}
		Self::new(sinks)
	}

	pub fn sink_names(&self) -> Vec<&str> {
		self.sinks.iter().map(|s| s.name()).collect()
	}

	/// Publishes `entry` to all sinks. Every sink is attempted; the first
	/// failure is returned.
	#[instrument(skip(self, entry), fields(action = %entry.action))]
	pub async fn record(&self, entry: AuditLogEntry) -> AuditResult<()> {
		let mut first_error = None;
		for sink in &self.sinks {
			match sink.publish(&entry).await {
				Ok(()) => debug!(sink = sink.name(), "audit entry published"),
				Err(source) => {
					warn!(sink = sink.name(), error = %source, "audit sink publish failed");
					first_error.get_or_insert(AuditError::SinkError {
						sink: sink.name().to_string(),
						source,
					});
				}
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}
