// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML file, environment.

use std::path::PathBuf;
use std::str::FromStr;

use steward_common_config::{load_secret_env, SecretString};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, BackendConfigLayer, HttpConfigLayer, ImpersonationConfigLayer,
	LoggingConfigLayer, SessionConfigLayer,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/steward/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults. Values are applied during finalization, so the layer
/// itself is empty.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML configuration file. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `/etc/steward/server.toml`
	pub fn system() -> Self {
		Self::new(DEFAULT_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

/// Environment variable source.
///
/// Convention: `STEWARD_<SECTION>_<FIELD>`. Secrets also accept a
/// `<VAR>_FILE` variant pointing at a file holding the value.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = apply_vars(
			std::env::vars().filter(|(key, _)| key.starts_with("STEWARD_")),
		)?;

		if let Some(secret) = secret("STEWARD_BACKEND_ANON_KEY")? {
			backend(&mut layer).anon_key = Some(secret);
		}
		if let Some(secret) = secret("STEWARD_BACKEND_SERVICE_ROLE_KEY")? {
			backend(&mut layer).service_role_key = Some(secret);
		}
		if let Some(secret) = secret("STEWARD_SESSION_COOKIE_SECRET")? {
			layer
				.session
				.get_or_insert_with(SessionConfigLayer::default)
				.cookie_secret = Some(secret);
		}

		Ok(layer)
	}
}

fn secret(var: &str) -> Result<Option<SecretString>, ConfigError> {
	let value = load_secret_env(var).map_err(|e| ConfigError::Secret(format!("{var}: {e}")))?;
	if value.is_some() {
		trace!(var, "loaded secret from environment");
	}
	Ok(value)
}

fn backend(layer: &mut ServerConfigLayer) -> &mut BackendConfigLayer {
	layer.backend.get_or_insert_with(BackendConfigLayer::default)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: e.to_string(),
	})
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("expected a boolean, got '{value}'"),
		}),
	}
}

/// Builds a layer from non-secret `STEWARD_*` variables.
pub fn apply_vars<I>(vars: I) -> Result<ServerConfigLayer, ConfigError>
where
	I: IntoIterator<Item = (String, String)>,
{
	let mut layer = ServerConfigLayer::default();

	for (key, value) in vars {
		let value = value.trim().to_string();
		if value.is_empty() {
			continue;
		}
		trace!(key = %key, "processing env var");

		match key.as_str() {
			"STEWARD_HOST" => {
				layer.http.get_or_insert_with(HttpConfigLayer::default).host = Some(value);
			}
			"STEWARD_PORT" => {
				layer.http.get_or_insert_with(HttpConfigLayer::default).port =
					Some(parse(&key, &value)?);
			}
			"STEWARD_BASE_URL" => {
				layer.http.get_or_insert_with(HttpConfigLayer::default).base_url = Some(value);
			}

			"STEWARD_BACKEND_URL" => {
				backend(&mut layer).url = Some(value);
			}
			"STEWARD_BACKEND_TIMEOUT_SECS" => {
				backend(&mut layer).request_timeout_secs = Some(parse(&key, &value)?);
			}

			"STEWARD_SESSION_SECURE_COOKIES" => {
				layer
					.session
					.get_or_insert_with(SessionConfigLayer::default)
					.secure_cookies = Some(parse_bool(&key, &value)?);
			}
			"STEWARD_SESSION_MAX_AGE_SECS" => {
				layer
					.session
					.get_or_insert_with(SessionConfigLayer::default)
					.max_age_secs = Some(parse(&key, &value)?);
			}

			"STEWARD_IMPERSONATION_STASH_TTL_SECS" => {
				impersonation(&mut layer).stash_ttl_secs = Some(parse(&key, &value)?);
			}
			"STEWARD_IMPERSONATION_CALLBACK_PATH" => {
				impersonation(&mut layer).callback_path = Some(value);
			}
			"STEWARD_IMPERSONATION_LANDING_PATH" => {
				impersonation(&mut layer).landing_path = Some(value);
			}
			"STEWARD_IMPERSONATION_RETURN_PATH" => {
				impersonation(&mut layer).return_path = Some(value);
			}
			"STEWARD_IMPERSONATION_SIGN_IN_PATH" => {
				impersonation(&mut layer).sign_in_path = Some(value);
			}
			"STEWARD_IMPERSONATION_DEFAULT_NEXT_PATH" => {
				impersonation(&mut layer).default_next_path = Some(value);
			}
			"STEWARD_IMPERSONATION_UPSTREAM_TIMEOUT_SECS" => {
				impersonation(&mut layer).upstream_timeout_secs = Some(parse(&key, &value)?);
			}
			"STEWARD_IMPERSONATION_STASH_POLICY" => {
				impersonation(&mut layer).stash_policy = Some(parse(&key, &value)?);
			}
			"STEWARD_IMPERSONATION_RESTORE_LAST_SIGN_IN" => {
				impersonation(&mut layer).restore_last_sign_in = Some(parse_bool(&key, &value)?);
			}
			"STEWARD_IMPERSONATION_ADMIN_ROLES" => {
				impersonation(&mut layer).admin_roles = Some(
					value
						.split(',')
						.map(|r| r.trim().to_string())
						.filter(|r| !r.is_empty())
						.collect(),
				);
			}

			"STEWARD_LOG_LEVEL" => {
				layer
					.logging
					.get_or_insert_with(LoggingConfigLayer::default)
					.level = Some(value);
			}
			"STEWARD_LOG_FORMAT" => {
				layer
					.logging
					.get_or_insert_with(LoggingConfigLayer::default)
					.format = Some(parse(&key, &value)?);
			}

			"STEWARD_AUDIT_ENABLED" => {
				audit(&mut layer).enabled = Some(parse_bool(&key, &value)?);
			}
			"STEWARD_AUDIT_TRACING_SINK" => {
				audit(&mut layer).tracing_sink = Some(parse_bool(&key, &value)?);
			}
			"STEWARD_AUDIT_STORE_SINK" => {
				audit(&mut layer).store_sink = Some(parse_bool(&key, &value)?);
			}

			_ => {}
		}
	}

	Ok(layer)
}

fn impersonation(layer: &mut ServerConfigLayer) -> &mut ImpersonationConfigLayer {
	layer
		.impersonation
		.get_or_insert_with(ImpersonationConfigLayer::default)
}

fn audit(layer: &mut ServerConfigLayer) -> &mut AuditConfigLayer {
	layer.audit.get_or_insert_with(AuditConfigLayer::default)
}
