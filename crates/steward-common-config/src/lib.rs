// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Common configuration primitives for Steward.
//!
//! - [`Secret<T>`] re-exported from [`steward_common_secret`]
//! - [`load_secret_env`] for `VAR` / `VAR_FILE` secrets (backend keys,
//!   cookie signing secret)

pub mod env;

pub use steward_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};
