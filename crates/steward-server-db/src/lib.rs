// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Data access for Steward.
//!
//! [`DataStore`] is a generic table/RPC interface over the backend's data
//! API; [`PostgrestStore`] implements it over HTTP. The repositories give
//! typed access to the tables Steward uses.

pub mod error;
pub mod logs;
pub mod postgrest;
pub mod profiles;
pub mod query;
pub mod roles;
pub mod rpc;
pub mod settings;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, Result};
pub use logs::{LogActor, LogInsert, LogQuery, LogRecord, LogRepository};
pub use postgrest::PostgrestStore;
pub use profiles::ProfileRepository;
pub use query::{Filter, Order, Query, Range};
pub use roles::{is_hex_colour, RoleRepository};
pub use rpc::restore_last_sign_in;
pub use settings::{NewSetting, SettingUpdate, SettingsRepository};
pub use store::{DataStore, Page};
