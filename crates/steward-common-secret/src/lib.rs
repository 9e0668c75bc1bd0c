// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrapper type for bearer tokens, API keys and cookie secrets.
//!
//! Access and refresh tokens flow through almost every impersonation code
//! path, so they are carried as [`SecretString`] values:
//!
//! - `Debug`, `Display` and `Serialize` all print `[REDACTED]`
//! - the inner value is zeroized on drop
//! - reading the value requires an explicit [`Secret::expose`] call
//!
//! ```
//! use steward_common_secret::SecretString;
//!
//! let token = SecretString::new("eyJhbGciOi...".to_string());
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! assert_eq!(token.expose(), "eyJhbGciOi...");
//! ```

use std::fmt;
use zeroize::Zeroize;

/// Placeholder written wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value that never prints itself.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Secret strings: tokens, keys, passwords.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the inner value. Every call site is a deliberate disclosure.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Copy the inner value out, leaving the original to be zeroized.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl SecretString {
	/// True when the wrapped string is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Secret::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Secret::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	// Serializing never leaks; wire formats that need the value build their
	// own struct from `expose()`.
	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_and_display_are_redacted() {
		let secret = SecretString::new("refresh-abc".to_string());
		assert_eq!(format!("{secret}"), REDACTED);
		assert!(!format!("{secret:?}").contains("refresh-abc"));
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::from("access-123");
		assert_eq!(secret.expose(), "access-123");
		assert!(!secret.is_empty());
		assert!(SecretString::from("").is_empty());
	}

	#[test]
	fn serialize_is_redacted_but_deserialize_reads_value() {
		let secret = SecretString::from("sk-live");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, format!("\"{REDACTED}\""));

		let parsed: SecretString = serde_json::from_str("\"sk-live\"").unwrap();
		assert_eq!(parsed, secret);
	}

	proptest! {
		#[test]
		fn display_never_contains_value(value in "[a-z0-9]{8,40}") {
			let secret = SecretString::new(value.clone());
			let displayed = format!("{secret}");
			let debugged = format!("{secret:?}");
			prop_assert!(!displayed.contains(&value));
			prop_assert!(!debugged.contains(&value));
		}
	}
}
