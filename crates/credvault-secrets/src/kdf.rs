// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HKDF-SHA256 content-key derivation.
//!
//! The KEK is never used as a cipher key. Each envelope gets its own content
//! key, `HKDF-SHA256(ikm = KEK, salt = per-envelope salt, info = context)`.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};
use crate::keyring::Kek;

/// Size of a derived content key (the XChaCha20-Poly1305 key size).
pub const CONTENT_KEY_SIZE: usize = 32;

/// Largest output HKDF-SHA256 can produce (255 hash blocks).
pub const MAX_OUTPUT_SIZE: usize = 255 * 32;

/// Derive `length` bytes of key material.
pub fn derive(
	ikm: &[u8],
	salt: &[u8],
	info: &[u8],
	length: usize,
) -> SecretsResult<Zeroizing<Vec<u8>>> {
	if length > MAX_OUTPUT_SIZE {
		return Err(SecretsError::KeyDerivation(format!(
			"requested {length} bytes, HKDF-SHA256 produces at most {MAX_OUTPUT_SIZE}"
		)));
	}

	let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
	let mut okm = Zeroizing::new(vec![0u8; length]);
	hkdf
		.expand(info, okm.as_mut_slice())
		.map_err(|e| SecretsError::KeyDerivation(e.to_string()))?;
	Ok(okm)
}

/// Derive the content key for one envelope.
pub fn derive_content_key(
	kek: &Kek,
	salt: &[u8],
	info: &[u8],
) -> SecretsResult<Zeroizing<[u8; CONTENT_KEY_SIZE]>> {
	let hkdf = Hkdf::<Sha256>::new(Some(salt), kek.as_bytes());
	let mut key = Zeroizing::new([0u8; CONTENT_KEY_SIZE]);
	hkdf
		.expand(info, key.as_mut())
		.map_err(|e| SecretsError::KeyDerivation(e.to_string()))?;
	Ok(key)
}
