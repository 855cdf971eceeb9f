// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned secret envelopes and their storage encoding.
//!
//! An envelope is stored as compact JSON with binary fields in padded,
//! standard-alphabet base64:
//!
//! ```json
//! {"v":1,"kid":"k1","s":"<salt>","n":"<nonce>","ct":"<ciphertext+tag>"}
//! ```
//!
//! Field order and spelling are part of the storage contract; previously
//! sealed rows must keep decoding.
//!
//! Non-ASCII kids are written as raw UTF-8, where older writers emitted
//! `\uXXXX` escapes. Both forms decode to the same kid, and the associated
//! data is built from the decoded kid, so either opens. Kids are ASCII in
//! practice.
//!
//! Each format version is its own variant of [`Envelope`]. A new format adds a
//! variant and its own constants; the v1 path is never touched.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SecretsError, SecretsResult};

/// Application tag bound into every envelope's associated data.
pub const APP_TAG: &str = "catai";

/// A sealed secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
	V1(EnvelopeV1),
}

/// Version 1: HKDF-SHA256 content key, XChaCha20-Poly1305.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeV1 {
	pub kid: String,
	/// At least [`EnvelopeV1::MIN_SALT_SIZE`] bytes.
	pub salt: Vec<u8>,
	pub nonce: [u8; EnvelopeV1::NONCE_SIZE],
	/// Ciphertext followed by the 16-byte Poly1305 tag.
	pub ciphertext: Vec<u8>,
}

impl EnvelopeV1 {
	pub const VERSION: u64 = 1;
	/// Salt length written by `seal`.
	pub const SALT_SIZE: usize = 16;
	/// Shortest salt accepted when decoding.
	pub const MIN_SALT_SIZE: usize = 16;
	pub const NONCE_SIZE: usize = 24;
	pub const TAG_SIZE: usize = 16;
	/// HKDF info for content keys.
	pub const KDF_INFO: &'static [u8] = b"catai-secrets-v1";

	/// Associated data: `catai|v1|<kid>`.
	pub fn aad(&self) -> Vec<u8> {
		Self::aad_for(&self.kid)
	}

	pub(crate) fn aad_for(kid: &str) -> Vec<u8> {
		format!("{APP_TAG}|v{}|{kid}", Self::VERSION).into_bytes()
	}
}

impl std::fmt::Debug for EnvelopeV1 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EnvelopeV1")
			.field("kid", &self.kid)
			.field("ciphertext_len", &self.ciphertext.len())
			.finish_non_exhaustive()
	}
}

#[derive(Deserialize)]
struct VersionHeader {
	v: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireV1 {
	v: u64,
	kid: String,
	s: String,
	n: String,
	ct: String,
}

impl Envelope {
	pub fn version(&self) -> u64 {
		match self {
			Envelope::V1(_) => EnvelopeV1::VERSION,
		}
	}

	/// The key-id this envelope was sealed under.
	pub fn kid(&self) -> &str {
		match self {
			Envelope::V1(v1) => &v1.kid,
		}
	}

	/// Encode for storage.
	pub fn to_json(&self) -> SecretsResult<String> {
		match self {
			Envelope::V1(v1) => {
				let wire = WireV1 {
					v: EnvelopeV1::VERSION,
					kid: v1.kid.clone(),
					s: BASE64.encode(&v1.salt),
					n: BASE64.encode(v1.nonce),
					ct: BASE64.encode(&v1.ciphertext),
				};
				serde_json::to_string(&wire)
					.map_err(|e| SecretsError::Internal(format!("envelope encoding failed: {e}")))
			}
		}
	}

	/// Decode a stored envelope.
	///
	/// Unknown versions are [`SecretsError::UnsupportedVersion`]. Every
	/// structural defect is [`SecretsError::DecryptionFailed`]; the reason is
	/// only logged at debug level.
	pub fn from_json(encoded: &str) -> SecretsResult<Self> {
		let header: VersionHeader = serde_json::from_str(encoded).map_err(malformed)?;

		match header.v.as_u64() {
			Some(EnvelopeV1::VERSION) => decode_v1(encoded).map(Envelope::V1),
			_ => Err(SecretsError::UnsupportedVersion(header.v.to_string())),
		}
	}
}

fn decode_v1(encoded: &str) -> SecretsResult<EnvelopeV1> {
	let wire: WireV1 = serde_json::from_str(encoded).map_err(malformed)?;

	let salt = BASE64.decode(&wire.s).map_err(malformed)?;
	let nonce = BASE64.decode(&wire.n).map_err(malformed)?;
	let ciphertext = BASE64.decode(&wire.ct).map_err(malformed)?;

	if salt.len() < EnvelopeV1::MIN_SALT_SIZE {
		return Err(malformed(format!("salt is {} bytes", salt.len())));
	}
	let nonce: [u8; EnvelopeV1::NONCE_SIZE] = nonce
		.try_into()
		.map_err(|n: Vec<u8>| malformed(format!("nonce is {} bytes", n.len())))?;
	if ciphertext.len() < EnvelopeV1::TAG_SIZE {
		return Err(malformed(format!(
			"ciphertext is {} bytes, shorter than the tag",
			ciphertext.len()
		)));
	}

	Ok(EnvelopeV1 {
		kid: wire.kid,
		salt,
		nonce,
		ciphertext,
	})
}

fn malformed(reason: impl std::fmt::Display) -> SecretsError {
	debug!(%reason, "Rejected malformed envelope");
	SecretsError::DecryptionFailed
}
