// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lazy key rotation.
//!
//! Rotating the active key never bulk re-encrypts stored secrets. Each secret
//! moves to the new key the next time it is read: the caller gets the
//! plaintext plus, when the envelope was sealed under a non-active key, a
//! replacement envelope to write back.

use zeroize::Zeroizing;

use crate::cipher;
use crate::envelope::Envelope;
use crate::error::SecretsResult;
use crate::loader::KeyringLoader;

/// Result of [`read_and_maybe_rewrap`].
pub struct Rewrap {
	pub plaintext: Zeroizing<Vec<u8>>,
	/// Present only when the envelope's key is not the active key.
	pub replacement: Option<Envelope>,
}

impl Rewrap {
	pub fn rewrapped(&self) -> bool {
		self.replacement.is_some()
	}
}

impl std::fmt::Debug for Rewrap {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Rewrap")
			.field("plaintext", &"[REDACTED]")
			.field("replacement", &self.replacement)
			.finish()
	}
}

/// Open `envelope` and, if it was sealed under a key other than the active
/// one, seal the plaintext again under the active key.
///
/// Both decisions use one keyring snapshot, so a concurrent reload cannot
/// make this open under one keyring and rewrap under another. Persisting the
/// replacement is the caller's job; an unwritten replacement is harmless.
pub fn read_and_maybe_rewrap(loader: &KeyringLoader, envelope: &Envelope) -> SecretsResult<Rewrap> {
	let keyring = loader.keyring()?;

	let kek = keyring.resolve(envelope.kid())?;
	let plaintext = cipher::open(envelope, kek)?;

	let (active_kid, active_kek) = keyring.resolve_active()?;
	if envelope.kid() == active_kid {
		return Ok(Rewrap {
			plaintext,
			replacement: None,
		});
	}

	let replacement = cipher::seal(&plaintext, active_kid, active_kek)?;
	Ok(Rewrap {
		plaintext,
		replacement: Some(replacement),
	})
}
