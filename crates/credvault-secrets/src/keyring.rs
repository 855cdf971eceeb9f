// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keyring document model and validation.
//!
//! The keyring is an operator-managed JSON document:
//!
//! ```json
//! {
//!   "active_kid": "k2",
//!   "keys": {
//!     "k1": { "kek_b64": "...", "status": "retired" },
//!     "k2": { "kek_b64": "...", "status": "active" }
//!   }
//! }
//! ```
//!
//! [`Keyring::from_json`] is the only way to obtain a [`Keyring`], so every
//! value of that type has already passed validation.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use credvault_common_secret::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of a key-encryption key in bytes.
pub const KEK_SIZE: usize = 32;

/// Lifecycle status of a keyring entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
	/// Used for new encryptions.
	Active,
	/// Decrypt-only; envelopes under it are re-wrapped on read.
	Retired,
	/// Must not decrypt.
	Revoked,
}

/// A 256-bit key-encryption key.
#[derive(Clone)]
pub struct Kek(Zeroizing<[u8; KEK_SIZE]>);

impl Kek {
	pub fn from_bytes(bytes: [u8; KEK_SIZE]) -> Self {
		Self(Zeroizing::new(bytes))
	}

	/// Decode a standard-alphabet, padded base64 KEK.
	pub fn from_base64(encoded: &SecretString) -> SecretsResult<Self> {
		let decoded: Zeroizing<Vec<u8>> = Zeroizing::new(
			BASE64
				.decode(encoded.expose().trim().as_bytes())
				.map_err(|e| SecretsError::Configuration(format!("invalid KEK base64: {e}")))?,
		);

		if decoded.len() != KEK_SIZE {
			return Err(SecretsError::Configuration(format!(
				"KEK must be {} bytes, got {}",
				KEK_SIZE,
				decoded.len()
			)));
		}

		let mut kek = Zeroizing::new([0u8; KEK_SIZE]);
		kek.copy_from_slice(&decoded);
		Ok(Self(kek))
	}

	pub(crate) fn as_bytes(&self) -> &[u8; KEK_SIZE] {
		&self.0
	}
}

impl PartialEq for Kek {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_slice() == other.0.as_slice()
	}
}

impl Eq for Kek {}

impl std::fmt::Debug for Kek {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("Kek([REDACTED])")
	}
}

#[derive(Deserialize)]
struct KeyringDocument {
	#[serde(default, deserialize_with = "lenient_metadata")]
	version: Option<u32>,
	#[serde(default)]
	active_kid: String,
	#[serde(default)]
	keys: BTreeMap<String, KeyEntryDocument>,
}

#[derive(Deserialize)]
struct KeyEntryDocument {
	#[serde(default)]
	kek_b64: Option<SecretString>,
	status: KeyStatus,
	#[serde(default, deserialize_with = "lenient_timestamp")]
	created_at: Option<DateTime<Utc>>,
}

// Generator metadata is informational. A value of the wrong shape is dropped
// with a warning instead of failing the whole keyring.
fn lenient_metadata<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = serde_json::Value::deserialize(deserializer)?;
	if value.is_null() {
		return Ok(None);
	}
	match serde_json::from_value(value) {
		Ok(parsed) => Ok(Some(parsed)),
		Err(e) => {
			warn!(error = %e, "Ignoring malformed keyring metadata");
			Ok(None)
		}
	}
}

/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (read as UTC).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = serde_json::Value::deserialize(deserializer)?;
	let parsed = match &value {
		serde_json::Value::Null => return Ok(None),
		serde_json::Value::String(text) => parse_timestamp(text),
		_ => None,
	};
	if parsed.is_none() {
		warn!(created_at = %value, "Ignoring malformed keyring created_at");
	}
	Ok(parsed)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
	if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
		return Some(parsed.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
		.ok()
		.map(|naive| Utc.from_utc_datetime(&naive))
}

enum KeyMaterial {
	Usable(Kek),
	Revoked,
}

struct KeyEntry {
	status: KeyStatus,
	material: KeyMaterial,
	created_at: Option<DateTime<Utc>>,
}

/// A validated keyring.
///
/// Invariants: at least one entry, `active_kid` names an entry whose status
/// is `active`, and every active or retired entry holds a 32-byte KEK.
/// Revoked entries hold no key material at all.
pub struct Keyring {
	version: Option<u32>,
	active_kid: String,
	entries: BTreeMap<String, KeyEntry>,
}

impl Keyring {
	/// Parse and validate a keyring document.
	pub fn from_json(document: &[u8]) -> SecretsResult<Self> {
		let doc: KeyringDocument = serde_json::from_slice(document)
			.map_err(|e| SecretsError::Configuration(format!("keyring document is invalid: {e}")))?;

		if doc.active_kid.is_empty() {
			return Err(SecretsError::Configuration(
				"keyring has no active_kid".to_string(),
			));
		}

		if doc.keys.is_empty() {
			return Err(SecretsError::Configuration("keyring has no keys".to_string()));
		}

		let mut entries = BTreeMap::new();
		for (kid, entry) in doc.keys {
			let material = match entry.status {
				KeyStatus::Revoked => KeyMaterial::Revoked,
				KeyStatus::Active | KeyStatus::Retired => {
					let encoded = entry.kek_b64.as_ref().ok_or_else(|| {
						SecretsError::Configuration(format!("key {kid:?} has no kek_b64"))
					})?;
					let kek = Kek::from_base64(encoded).map_err(|e| match e {
						SecretsError::Configuration(msg) => {
							SecretsError::Configuration(format!("key {kid:?}: {msg}"))
						}
						other => other,
					})?;
					KeyMaterial::Usable(kek)
				}
			};
			entries.insert(
				kid,
				KeyEntry {
					status: entry.status,
					material,
					created_at: entry.created_at,
				},
			);
		}

		match entries.get(&doc.active_kid) {
			None => {
				return Err(SecretsError::Configuration(format!(
					"active_kid {:?} is not in keys",
					doc.active_kid
				)));
			}
			Some(entry) if entry.status != KeyStatus::Active => {
				return Err(SecretsError::Configuration(format!(
					"active_kid {:?} has status {:?}, expected active",
					doc.active_kid, entry.status
				)));
			}
			Some(_) => {}
		}

		let active_count = entries
			.values()
			.filter(|e| e.status == KeyStatus::Active)
			.count();
		if active_count > 1 {
			warn!(
				active_kid = %doc.active_kid,
				active_count,
				"Keyring has more than one active key; only active_kid is used for sealing"
			);
		}

		Ok(Self {
			version: doc.version,
			active_kid: doc.active_kid,
			entries,
		})
	}

	pub fn active_kid(&self) -> &str {
		&self.active_kid
	}

	/// The kid and KEK used for new encryptions.
	pub fn resolve_active(&self) -> SecretsResult<(&str, &Kek)> {
		let kek = self.resolve(&self.active_kid)?;
		Ok((&self.active_kid, kek))
	}

	/// The KEK for `kid`, which may be active or retired but not revoked.
	pub fn resolve(&self, kid: &str) -> SecretsResult<&Kek> {
		match self.entries.get(kid).map(|entry| &entry.material) {
			Some(KeyMaterial::Usable(kek)) => Ok(kek),
			Some(KeyMaterial::Revoked) | None => Err(SecretsError::KeyNotFound(kid.to_string())),
		}
	}

	/// Status of `kid`, if present.
	pub fn status(&self, kid: &str) -> Option<KeyStatus> {
		self.entries.get(kid).map(|entry| entry.status)
	}

	/// Key-material-free description of this keyring.
	pub fn summary(&self) -> KeyringSummary {
		KeyringSummary {
			version: self.version,
			active_kid: self.active_kid.clone(),
			keys: self
				.entries
				.iter()
				.map(|(kid, entry)| KeySummary {
					kid: kid.clone(),
					status: entry.status,
					created_at: entry.created_at,
				})
				.collect(),
		}
	}
}

impl std::fmt::Debug for Keyring {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Keyring")
			.field("version", &self.version)
			.field("active_kid", &self.active_kid)
			.field("keys", &self.entries.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Safe-to-display view of a keyring: kids, statuses and dates only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyringSummary {
	pub version: Option<u32>,
	pub active_kid: String,
	pub keys: Vec<KeySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
	pub kid: String,
	pub status: KeyStatus,
	pub created_at: Option<DateTime<Utc>>,
}

impl KeyringSummary {
	/// Number of entries with the given status.
	pub fn count(&self, status: KeyStatus) -> usize {
		self.keys.iter().filter(|k| k.status == status).count()
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;

	pub fn kek_b64(fill: u8) -> String {
		BASE64.encode([fill; KEK_SIZE])
	}

	/// Build a keyring document from `(kid, fill byte, status)` triples.
	pub fn keyring_json(active_kid: &str, keys: &[(&str, u8, &str)]) -> String {
		let keys: serde_json::Map<String, serde_json::Value> = keys
			.iter()
			.map(|(kid, fill, status)| {
				(
					kid.to_string(),
					serde_json::json!({ "kek_b64": kek_b64(*fill), "status": status }),
				)
			})
			.collect();
		serde_json::json!({ "active_kid": active_kid, "keys": keys }).to_string()
	}
}
