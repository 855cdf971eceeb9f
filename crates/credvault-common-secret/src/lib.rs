// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for plaintext credentials.
//!
//! Provider API keys only exist in plaintext between `open` and the outbound
//! provider call. While they do, they live in a [`Secret<T>`], which:
//!
//! - prints `[REDACTED]` through `Debug`, `Display` and `Serialize`
//! - zeroizes its buffer on drop
//! - requires an explicit `.expose()` to read
//!
//! ```
//! use credvault_common_secret::SecretString;
//!
//! let api_key = SecretString::new("sk-live-0123456789".to_string());
//!
//! assert_eq!(format!("{api_key}"), "[REDACTED]");
//! assert_eq!(format!("{api_key:?}"), "Secret(\"[REDACTED]\")");
//! assert_eq!(api_key.hint().as_deref(), Some("6789"));
//! assert_eq!(api_key.expose(), "sk-live-0123456789");
//! ```
//!
//! `tracing` fields recorded with `%secret` or `?secret` go through the same
//! `Display`/`Debug` impls, so they are redacted as well.

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// Number of trailing characters revealed by [`SecretString::hint`].
pub const HINT_CHARS: usize = 4;

/// Secrets shorter than this never produce a hint.
pub const MIN_HINT_SOURCE_CHARS: usize = 8;

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// There is no `Deref`; call sites must go through [`Secret::expose`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// A plaintext credential held as text.
pub type SecretString = Secret<String>;

/// A plaintext credential held as raw bytes, as produced by decryption.
pub type SecretBytes = Secret<Vec<u8>>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// Last [`HINT_CHARS`] characters, for "••••abcd"-style display.
	///
	/// Returns `None` for secrets under [`MIN_HINT_SOURCE_CHARS`] characters,
	/// where four characters would give away most of the value. Older key
	/// listings showed the last four of any non-empty key; this is stricter.
	pub fn hint(&self) -> Option<String> {
		let count = self.inner.chars().count();
		if count < MIN_HINT_SOURCE_CHARS {
			return None;
		}
		Some(self.inner.chars().skip(count - HINT_CHARS).collect())
	}

	/// The UTF-8 bytes of this secret, still wrapped.
	pub fn to_bytes(&self) -> SecretBytes {
		Secret::new(self.inner.as_bytes().to_vec())
	}
}

impl SecretBytes {
	/// Reinterpret the bytes as UTF-8 text without copying.
	///
	/// On invalid UTF-8 the buffer is zeroized and `None` is returned.
	pub fn into_utf8(mut self) -> Option<SecretString> {
		let bytes = std::mem::take(&mut self.inner);
		match String::from_utf8(bytes) {
			Ok(text) => Some(Secret::new(text)),
			Err(err) => {
				let mut bytes = err.into_bytes();
				bytes.zeroize();
				None
			}
		}
	}
}

impl<T> From<T> for Secret<T>
where
	T: Zeroize,
{
	fn from(inner: T) -> Self {
		Self::new(inner)
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

	/// Deserializes the real value; keyring documents carry `kek_b64` this way.
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
