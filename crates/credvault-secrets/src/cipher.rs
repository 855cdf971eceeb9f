// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Envelope sealing and opening.
//!
//! v1 uses XChaCha20-Poly1305. Its 192-bit nonce makes independent random
//! nonces safe at any realistic volume, and each envelope also has its own
//! HKDF-derived content key, so a (key, nonce) pair is never reused.

use chacha20poly1305::{
	aead::{Aead, KeyInit, OsRng, Payload},
	Key, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::envelope::{Envelope, EnvelopeV1};
use crate::error::{SecretsError, SecretsResult};
use crate::kdf;
use crate::keyring::Kek;

/// Seal `plaintext` under `kek`, recording `kid` in the envelope.
///
/// Always produces the newest envelope version.
pub fn seal(plaintext: &[u8], kid: &str, kek: &Kek) -> SecretsResult<Envelope> {
	seal_v1(plaintext, kid, kek).map(Envelope::V1)
}

/// Open an envelope with `kek`.
///
/// Any authentication failure (wrong key, altered ciphertext, nonce, salt or
/// kid) is [`SecretsError::DecryptionFailed`].
pub fn open(envelope: &Envelope, kek: &Kek) -> SecretsResult<Zeroizing<Vec<u8>>> {
	match envelope {
		Envelope::V1(v1) => open_v1(v1, kek),
	}
}

fn seal_v1(plaintext: &[u8], kid: &str, kek: &Kek) -> SecretsResult<EnvelopeV1> {
	let mut salt = vec![0u8; EnvelopeV1::SALT_SIZE];
	OsRng.fill_bytes(&mut salt);
	let mut nonce = [0u8; EnvelopeV1::NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);

	let content_key = kdf::derive_content_key(kek, &salt, EnvelopeV1::KDF_INFO)?;
	let cipher = XChaCha20Poly1305::new(Key::from_slice(content_key.as_slice()));
	let aad = EnvelopeV1::aad_for(kid);

	let ciphertext = cipher
		.encrypt(
			XNonce::from_slice(&nonce),
			Payload {
				msg: plaintext,
				aad: &aad,
			},
		)
		.map_err(|e| SecretsError::Encryption(format!("secret encryption failed: {e}")))?;

	Ok(EnvelopeV1 {
		kid: kid.to_string(),
		salt,
		nonce,
		ciphertext,
	})
}

fn open_v1(envelope: &EnvelopeV1, kek: &Kek) -> SecretsResult<Zeroizing<Vec<u8>>> {
	let content_key = kdf::derive_content_key(kek, &envelope.salt, EnvelopeV1::KDF_INFO)?;
	let cipher = XChaCha20Poly1305::new(Key::from_slice(content_key.as_slice()));
	// Recomputed from the envelope's own kid, never read from storage.
	let aad = envelope.aad();

	let plaintext = cipher
		.decrypt(
			XNonce::from_slice(&envelope.nonce),
			Payload {
				msg: &envelope.ciphertext,
				aad: &aad,
			},
		)
		.map_err(|_| SecretsError::DecryptionFailed)?;

	Ok(Zeroizing::new(plaintext))
}
