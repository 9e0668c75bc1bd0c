// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Impersonation (session swap) configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What to do when an admin starts impersonating while an original
/// session is already stashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StashPolicy {
	/// Refuse with a conflict; the existing stash is kept.
	#[default]
	Reject,
	/// Replace the existing stash with the current session.
	Overwrite,
}

impl FromStr for StashPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"reject" => Ok(Self::Reject),
			"overwrite" => Ok(Self::Overwrite),
			other => Err(format!("unknown stash policy '{other}'")),
		}
	}
}

impl fmt::Display for StashPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Reject => f.write_str("reject"),
			Self::Overwrite => f.write_str("overwrite"),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ImpersonationConfig {
	/// Lifetime of the stashed original session cookie.
	pub stash_ttl_secs: i64,
	pub callback_path: String,
	/// Where the impersonated session lands after the callback.
	pub landing_path: String,
	/// Where the admin is sent after their session is restored.
	pub return_path: String,
	pub sign_in_path: String,
	/// Callback fallback when `next` is missing or not a local path.
	pub default_next_path: String,
	pub upstream_timeout_secs: u64,
	pub stash_policy: StashPolicy,
	pub restore_last_sign_in: bool,
	/// Role names allowed to impersonate.
	pub admin_roles: Vec<String>,
}

impl ImpersonationConfig {
	pub fn upstream_timeout(&self) -> Duration {
		Duration::from_secs(self.upstream_timeout_secs)
	}

	/// The configured paths, keyed by their config name.
	pub fn paths(&self) -> [(&'static str, &str); 5] {
		[
			("impersonation.callback_path", &self.callback_path),
			("impersonation.landing_path", &self.landing_path),
			("impersonation.return_path", &self.return_path),
			("impersonation.sign_in_path", &self.sign_in_path),
			("impersonation.default_next_path", &self.default_next_path),
		]
	}
}

impl Default for ImpersonationConfig {
	fn default() -> Self {
		ImpersonationConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImpersonationConfigLayer {
	#[serde(default)]
	pub stash_ttl_secs: Option<i64>,
	#[serde(default)]
	pub callback_path: Option<String>,
	#[serde(default)]
	pub landing_path: Option<String>,
	#[serde(default)]
	pub return_path: Option<String>,
	#[serde(default)]
	pub sign_in_path: Option<String>,
	#[serde(default)]
	pub default_next_path: Option<String>,
	#[serde(default)]
	pub upstream_timeout_secs: Option<u64>,
	#[serde(default)]
	pub stash_policy: Option<StashPolicy>,
	#[serde(default)]
	pub restore_last_sign_in: Option<bool>,
	#[serde(default)]
	pub admin_roles: Option<Vec<String>>,
}

impl ImpersonationConfigLayer {
	pub fn merge(&mut self, other: ImpersonationConfigLayer) {
		if other.stash_ttl_secs.is_some() {
			self.stash_ttl_secs = other.stash_ttl_secs;
		}
		if other.callback_path.is_some() {
			self.callback_path = other.callback_path;
		}
		if other.landing_path.is_some() {
			self.landing_path = other.landing_path;
		}
		if other.return_path.is_some() {
			self.return_path = other.return_path;
		}
		if other.sign_in_path.is_some() {
			self.sign_in_path = other.sign_in_path;
		}
		if other.default_next_path.is_some() {
			self.default_next_path = other.default_next_path;
		}
		if other.upstream_timeout_secs.is_some() {
			self.upstream_timeout_secs = other.upstream_timeout_secs;
		}
		if other.stash_policy.is_some() {
			self.stash_policy = other.stash_policy;
		}
		if other.restore_last_sign_in.is_some() {
			self.restore_last_sign_in = other.restore_last_sign_in;
		}
		if other.admin_roles.is_some() {
			self.admin_roles = other.admin_roles;
		}
	}

	pub fn finalize(self) -> ImpersonationConfig {
		ImpersonationConfig {
			stash_ttl_secs: self.stash_ttl_secs.unwrap_or(86_400),
			callback_path: self
				.callback_path
				.unwrap_or_else(|| "/auth/callback".to_string()),
			landing_path: self.landing_path.unwrap_or_else(|| "/app".to_string()),
			return_path: self.return_path.unwrap_or_else(|| "/app/users".to_string()),
			sign_in_path: self.sign_in_path.unwrap_or_else(|| "/sign_in".to_string()),
			default_next_path: self
				.default_next_path
				.unwrap_or_else(|| "/account".to_string()),
			upstream_timeout_secs: self.upstream_timeout_secs.unwrap_or(10),
			stash_policy: self.stash_policy.unwrap_or_default(),
			restore_last_sign_in: self.restore_last_sign_in.unwrap_or(true),
			admin_roles: self
				.admin_roles
				.unwrap_or_else(|| vec!["admin".to_string()]),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = ImpersonationConfig::default();
		assert_eq!(config.stash_ttl_secs, 86_400);
		assert_eq!(config.callback_path, "/auth/callback");
		assert_eq!(config.landing_path, "/app");
		assert_eq!(config.return_path, "/app/users");
		assert_eq!(config.sign_in_path, "/sign_in");
		assert_eq!(config.default_next_path, "/account");
		assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
		assert_eq!(config.stash_policy, StashPolicy::Reject);
		assert!(config.restore_last_sign_in);
		assert_eq!(config.admin_roles, vec!["admin".to_string()]);
	}

	#[test]
	fn stash_policy_parses_case_insensitively() {
		assert_eq!("Overwrite".parse::<StashPolicy>(), Ok(StashPolicy::Overwrite));
		assert_eq!("reject".parse::<StashPolicy>(), Ok(StashPolicy::Reject));
		assert!("ignore".parse::<StashPolicy>().is_err());
	}

	#[test]
	fn return_path_override() {
		let mut base = ImpersonationConfigLayer::default();
		base.merge(ImpersonationConfigLayer {
			return_path: Some("/account/users".to_string()),
			..Default::default()
		});
		assert_eq!(base.finalize().return_path, "/account/users");
	}
}
