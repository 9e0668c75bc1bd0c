// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage for the admin's original session while impersonating.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StashError {
	#[error("stash unavailable: {0}")]
	Unavailable(String),
}

/// Holds at most one envelope. Scoped to a single browser.
#[async_trait]
pub trait SessionStash: Send + Sync {
	async fn load(&self) -> Result<Option<String>, StashError>;

	async fn store(&self, envelope: &str, ttl: Duration) -> Result<(), StashError>;

	async fn remove(&self) -> Result<(), StashError>;
}

#[derive(Default)]
struct Inner {
	value: Option<(String, Duration)>,
	fail_load: bool,
	fail_store: bool,
	fail_remove: bool,
	writes: usize,
}

/// In-memory stash with injectable failures.
#[derive(Default)]
pub struct MemoryStash {
	inner: Mutex<Inner>,
}

impl MemoryStash {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_envelope(envelope: &str) -> Self {
		let stash = Self::new();
		stash.lock().value = Some((envelope.to_string(), Duration::from_secs(86_400)));
		stash
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|p| p.into_inner())
	}

	pub fn envelope(&self) -> Option<String> {
		self.lock().value.as_ref().map(|(v, _)| v.clone())
	}

	pub fn ttl(&self) -> Option<Duration> {
		self.lock().value.as_ref().map(|(_, ttl)| *ttl)
	}

	/// Number of successful `store` and `remove` calls.
	pub fn writes(&self) -> usize {
		self.lock().writes
	}

	pub fn fail_load(&self) {
		self.lock().fail_load = true;
	}

	pub fn fail_store(&self) {
		self.lock().fail_store = true;
	}

	pub fn fail_remove(&self) {
		self.lock().fail_remove = true;
	}
}

#[async_trait]
impl SessionStash for MemoryStash {
	async fn load(&self) -> Result<Option<String>, StashError> {
		let inner = self.lock();
		if inner.fail_load {
			return Err(StashError::Unavailable("load failed".to_string()));
		}
		Ok(inner.value.as_ref().map(|(v, _)| v.clone()))
	}

	async fn store(&self, envelope: &str, ttl: Duration) -> Result<(), StashError> {
		let mut inner = self.lock();
		if inner.fail_store {
			return Err(StashError::Unavailable("store failed".to_string()));
		}
		inner.value = Some((envelope.to_string(), ttl));
		inner.writes += 1;
		Ok(())
	}

	async fn remove(&self) -> Result<(), StashError> {
		let mut inner = self.lock();
		if inner.fail_remove {
			return Err(StashError::Unavailable("remove failed".to_string()));
		}
		inner.value = None;
		inner.writes += 1;
		Ok(())
	}
}
