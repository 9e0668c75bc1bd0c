// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for steward-server.
//!
//! Sources are merged in precedence order (defaults, then the TOML file,
//! then `STEWARD_*` environment variables), finalized into runtime structs
//! and validated once at startup.

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

use std::path::Path;

use tracing::{debug, info};

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, DEFAULT_CONFIG_PATH,
};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub backend: BackendConfig,
	pub session: SessionConfig,
	pub impersonation: ImpersonationConfig,
	pub logging: LoggingConfig,
	pub audit: AuditConfig,
}

/// Loads configuration from the default file location and the environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_config_with_file(None)
}

/// Loads configuration, reading TOML from `path` instead of the default
/// location when given.
pub fn load_config_with_file(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
	let toml = match path {
		Some(p) => TomlSource::new(p),
		None => TomlSource::system(),
	};
	let mut sources: Vec<Box<dyn ConfigSource>> =
		vec![Box::new(EnvSource), Box::new(DefaultsSource), Box::new(toml)];
	load_from_sources(&mut sources)
}

/// Merges `sources` in precedence order, then finalizes and validates.
pub fn load_from_sources(
	sources: &mut [Box<dyn ConfigSource>],
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources.iter() {
		debug!(source = source.name(), "merging config source");
		merged.merge(source.load()?);
	}

	let config = finalize(merged);
	validate(&config)?;
	info!(
		bind = %config.http.bind_addr(),
		backend = %config.backend.url,
		stash_policy = %config.impersonation.stash_policy,
		"configuration loaded"
	);
	Ok(config)
}

pub fn finalize(layer: ServerConfigLayer) -> ServerConfig {
	ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		backend: layer.backend.unwrap_or_default().finalize(),
		session: layer.session.unwrap_or_default().finalize(),
		impersonation: layer.impersonation.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		audit: layer.audit.unwrap_or_default().finalize(),
	}
}

pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
	url::Url::parse(&config.backend.url).map_err(|e| ConfigError::InvalidValue {
		key: "backend.url".to_string(),
		message: e.to_string(),
	})?;

	if config.backend.request_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"backend.request_timeout_secs must be greater than zero".to_string(),
		));
	}

	if let Some(secret) = &config.session.cookie_secret {
		if secret.expose().len() < MIN_COOKIE_SECRET_LEN {
			return Err(ConfigError::Validation(format!(
				"session.cookie_secret must be at least {MIN_COOKIE_SECRET_LEN} bytes"
			)));
		}
	}

	if config.session.max_age_secs <= 0 {
		return Err(ConfigError::Validation(
			"session.max_age_secs must be positive".to_string(),
		));
	}

	let imp = &config.impersonation;
	if imp.stash_ttl_secs <= 0 {
		return Err(ConfigError::Validation(
			"impersonation.stash_ttl_secs must be positive".to_string(),
		));
	}
	if imp.upstream_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"impersonation.upstream_timeout_secs must be greater than zero".to_string(),
		));
	}
	for (key, path) in imp.paths() {
		if !path.starts_with('/') || path.starts_with("//") {
			return Err(ConfigError::InvalidValue {
				key: key.to_string(),
				message: format!("'{path}' must be an absolute local path"),
			});
		}
	}
	if imp.admin_roles.is_empty() {
		return Err(ConfigError::Validation(
			"impersonation.admin_roles must name at least one role".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use steward_common_config::SecretString;

	struct FixedSource(Precedence, fn() -> ServerConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok((self.1)())
		}
	}

	fn port_layer(port: u16) -> ServerConfigLayer {
		ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(port),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn defaults_validate() {
		let config = finalize(ServerConfigLayer::default());
		assert!(validate(&config).is_ok());
	}

	#[test]
	fn higher_precedence_wins_regardless_of_order() {
		let mut sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(FixedSource(Precedence::Environment, || port_layer(7000))),
			Box::new(FixedSource(Precedence::ConfigFile, || port_layer(6000))),
		];
		let config = load_from_sources(&mut sources).unwrap();
		assert_eq!(config.http.port, 7000);
	}

	#[test]
	fn short_cookie_secret_is_rejected() {
		let mut config = ServerConfig::default();
		config.session.cookie_secret = Some(SecretString::new("too-short".to_string()));
		assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

		config.session.cookie_secret = Some(SecretString::new("x".repeat(64)));
		assert!(validate(&config).is_ok());
	}

	#[test]
	fn unparseable_backend_url_is_rejected() {
		let mut config = ServerConfig::default();
		config.backend.url = "not a url".to_string();
		assert!(matches!(
			validate(&config),
			Err(ConfigError::InvalidValue { ref key, .. }) if key == "backend.url"
		));
	}

	#[test]
	fn protocol_relative_paths_are_rejected() {
		let mut config = ServerConfig::default();
		config.impersonation.return_path = "//evil.example".to_string();
		assert!(validate(&config).is_err());

		config.impersonation.return_path = "app/users".to_string();
		assert!(validate(&config).is_err());
	}

	#[test]
	fn zero_upstream_timeout_is_rejected() {
		let mut config = ServerConfig::default();
		config.impersonation.upstream_timeout_secs = 0;
		assert!(validate(&config).is_err());
	}
}
