// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stored procedures.

use chrono::{DateTime, Utc};
use serde_json::json;
use steward_server_auth::UserId;

use crate::error::Result;
use crate::store::DataStore;

pub const RESTORE_LAST_SIGN_IN: &str = "restore_last_sign_in";

/// Puts a user's `last_sign_in_at` back to `at`, undoing the bump caused
/// by signing in through a generated link.
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn restore_last_sign_in(
	store: &dyn DataStore,
	user_id: &UserId,
	at: DateTime<Utc>,
) -> Result<()> {
	store
		.rpc(
			RESTORE_LAST_SIGN_IN,
			json!({ "user_id": user_id, "last_sign_in_timestamp": at }),
		)
		.await?;
	Ok(())
}
