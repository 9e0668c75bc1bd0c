// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared pagination utilities for API handlers.

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PageParams {
	pub page: Option<u32>,
	pub per_page: Option<u32>,
}

impl PageParams {
	/// One-based page number.
	pub fn page_or_default(&self) -> u32 {
		self.page.unwrap_or(1).max(1)
	}

	pub fn per_page_clamped(&self, default: u32, max: u32) -> u32 {
		self.per_page.unwrap_or(default).min(max).max(1)
	}
}
