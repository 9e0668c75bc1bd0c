// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Secret loading from the environment.
//!
//! The service-role key grants full admin access to the identity provider,
//! so deployments usually mount it as a file. Both forms are accepted:
//!
//! 1. `{VAR}_FILE` pointing at a file whose contents are the secret
//! 2. `{VAR}` holding the secret directly

use std::path::{Path, PathBuf};
use std::{env, fs};

use steward_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error(transparent)]
	Load(#[from] SecretEnvError),

	#[error("required secret not set: set {var} or {file_var}")]
	Missing { var: String, file_var: String },
}

/// Load a secret from `{var}_FILE` (preferred) or `{var}`.
///
/// A single trailing newline is stripped from file contents. Empty values
/// are treated as unset.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		return read_secret_file(Path::new(&path_str)).map(Some);
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}

/// Like [`load_secret_env`] but fails when neither variable is set.
pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}

fn read_secret_file(path: &Path) -> Result<SecretString, SecretEnvError> {
	let content = fs::read_to_string(path).map_err(|e| SecretEnvError::Io {
		path: path.to_path_buf(),
		source: e,
	})?;
	let trimmed = content.strip_suffix('\n').unwrap_or(&content);
	Ok(SecretString::new(trimmed.to_string()))
}
