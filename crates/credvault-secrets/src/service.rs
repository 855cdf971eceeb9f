// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! String-level secret operations for callers that store envelopes as text.
//!
//! This service combines:
//! - keyring resolution through a shared [`KeyringLoader`]
//! - envelope sealing and opening
//! - lazy re-wrap under the active key
//!
//! Plaintext crosses this boundary only as [`SecretString`]. Log records carry
//! kids, versions and booleans, never plaintext or key material.

use std::sync::Arc;

use credvault_common_secret::{SecretBytes, SecretString};
use tracing::{debug, error, instrument, warn, Span};
use zeroize::Zeroizing;

use crate::cipher;
use crate::envelope::Envelope;
use crate::error::{SecretsError, SecretsResult};
use crate::keyring::KeyringSummary;
use crate::loader::KeyringLoader;
use crate::rotation;

/// Outcome of [`SecretsService::read_and_maybe_rewrap`].
#[derive(Debug)]
pub struct RewrapOutcome {
	pub plaintext: SecretString,
	/// Encoded replacement envelope, present when the stored one used a
	/// non-active key. The caller persists it in its own transaction.
	pub new_envelope: Option<String>,
}

impl RewrapOutcome {
	pub fn rewrapped(&self) -> bool {
		self.new_envelope.is_some()
	}
}

/// Seals and opens provider credentials.
///
/// Cheap to clone; clones share one keyring cache.
#[derive(Debug, Clone)]
pub struct SecretsService {
	loader: Arc<KeyringLoader>,
}

impl SecretsService {
	pub fn new(loader: Arc<KeyringLoader>) -> Self {
		Self { loader }
	}

	pub fn loader(&self) -> &Arc<KeyringLoader> {
		&self.loader
	}

	/// Seal a credential under the active key and encode it for storage.
	#[instrument(skip_all, fields(kid = tracing::field::Empty))]
	pub fn seal_secret(&self, plaintext: &SecretString) -> SecretsResult<String> {
		let result = self.loader.resolve_active().and_then(|(kid, kek)| {
			Span::current().record("kid", kid.as_str());
			cipher::seal(plaintext.expose().as_bytes(), &kid, &kek)?.to_json()
		});

		match &result {
			Ok(_) => debug!("Sealed secret"),
			Err(e) => log_failure("seal", e),
		}
		result
	}

	/// Decode and open a stored envelope.
	#[instrument(skip_all, fields(kid = tracing::field::Empty, version = tracing::field::Empty))]
	pub fn open_secret(&self, envelope: &str) -> SecretsResult<SecretString> {
		let result = Envelope::from_json(envelope).and_then(|envelope| {
			record_envelope(&envelope);
			let kek = self.loader.resolve(envelope.kid())?;
			into_secret_string(cipher::open(&envelope, &kek)?)
		});

		match &result {
			Ok(_) => debug!("Opened secret"),
			Err(e) => log_failure("open", e),
		}
		result
	}

	/// Open a stored envelope, re-sealing it under the active key if it was
	/// sealed under another one.
	#[instrument(
		skip_all,
		fields(kid = tracing::field::Empty, version = tracing::field::Empty, rewrapped = tracing::field::Empty)
	)]
	pub fn read_and_maybe_rewrap(&self, envelope: &str) -> SecretsResult<RewrapOutcome> {
		let result = Envelope::from_json(envelope).and_then(|envelope| {
			record_envelope(&envelope);
			let rewrap = rotation::read_and_maybe_rewrap(&self.loader, &envelope)?;
			let new_envelope = rewrap
				.replacement
				.as_ref()
				.map(Envelope::to_json)
				.transpose()?;
			Ok(RewrapOutcome {
				plaintext: into_secret_string(rewrap.plaintext)?,
				new_envelope,
			})
		});

		match &result {
			Ok(outcome) => {
				Span::current().record("rewrapped", outcome.rewrapped());
				debug!(rewrapped = outcome.rewrapped(), "Read secret");
			}
			Err(e) => log_failure("read_and_maybe_rewrap", e),
		}
		result
	}

	/// Kids, statuses and dates of the current keyring; no key material.
	pub fn keyring_summary(&self) -> SecretsResult<KeyringSummary> {
		Ok(self.loader.keyring()?.summary())
	}
}

fn record_envelope(envelope: &Envelope) {
	let span = Span::current();
	span.record("kid", envelope.kid());
	span.record("version", envelope.version());
}

fn into_secret_string(mut plaintext: Zeroizing<Vec<u8>>) -> SecretsResult<SecretString> {
	SecretBytes::new(std::mem::take(&mut *plaintext))
		.into_utf8()
		.ok_or(SecretsError::InvalidPlaintext)
}

fn log_failure(operation: &'static str, err: &SecretsError) {
	if err.is_internal() {
		error!(operation, error = %err, "Secret operation failed");
	} else {
		warn!(operation, error = %err, "Secret operation rejected");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keyring::test_support::keyring_json;
	use crate::keyring::{KeyStatus, Kek};
	use crate::source::MemoryKeyringSource;
	use credvault_common_config::ExecutionMode;

	fn service(document: String) -> (Arc<MemoryKeyringSource>, SecretsService) {
		let source = Arc::new(MemoryKeyringSource::new(document));
		let loader = KeyringLoader::new(source.clone(), ExecutionMode::Development);
		(source, SecretsService::new(Arc::new(loader)))
	}

	fn secret(value: &str) -> SecretString {
		SecretString::new(value.to_string())
	}

	#[test]
	fn seal_then_open() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));

		let stored = service.seal_secret(&secret("sk-test-123456")).unwrap();
		assert!(stored.starts_with(r#"{"v":1,"kid":"k1","#));

		assert_eq!(service.open_secret(&stored).unwrap().expose(), "sk-test-123456");
	}

	#[test]
	fn empty_secret_roundtrips() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		let stored = service.seal_secret(&secret("")).unwrap();
		assert_eq!(service.open_secret(&stored).unwrap().expose(), "");
	}

	#[test]
	fn non_utf8_plaintext_is_invalid() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		let stored = cipher::seal(&[0xff, 0xfe, 0x00], "k1", &Kek::from_bytes([1; 32]))
			.unwrap()
			.to_json()
			.unwrap();

		assert!(matches!(
			service.open_secret(&stored),
			Err(SecretsError::InvalidPlaintext)
		));
	}

	#[test]
	fn garbage_is_decryption_failure() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		assert!(matches!(
			service.open_secret("definitely not an envelope"),
			Err(SecretsError::DecryptionFailed)
		));
	}

	#[test]
	fn unknown_kid_is_key_not_found() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		let stored = cipher::seal(b"x", "k9", &Kek::from_bytes([9; 32]))
			.unwrap()
			.to_json()
			.unwrap();

		let err = service.open_secret(&stored).unwrap_err();
		assert!(matches!(err, SecretsError::KeyNotFound(ref kid) if kid == "k9"));
		assert_eq!(err.status_code(), 404);
	}

	#[test]
	fn rewrap_reports_new_envelope_after_rotation() {
		let (source, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		let stored = service.seal_secret(&secret("provider-key")).unwrap();

		let outcome = service.read_and_maybe_rewrap(&stored).unwrap();
		assert!(!outcome.rewrapped());

		source.replace(keyring_json(
			"k2",
			&[("k1", 1, "retired"), ("k2", 2, "active")],
		));

		let outcome = service.read_and_maybe_rewrap(&stored).unwrap();
		assert_eq!(outcome.plaintext.expose(), "provider-key");
		let replacement = outcome.new_envelope.unwrap();
		assert!(replacement.starts_with(r#"{"v":1,"kid":"k2","#));

		let again = service.read_and_maybe_rewrap(&replacement).unwrap();
		assert!(!again.rewrapped());
	}

	#[test]
	fn unconfigured_keyring_fails_seal() {
		let (_, service) = service("{}".to_string());
		let err = service.seal_secret(&secret("provider-key")).unwrap_err();
		assert!(matches!(err, SecretsError::Configuration(_)));
		assert!(err.is_internal());
	}

	#[test]
	fn summary_lists_statuses() {
		let (_, service) = service(keyring_json(
			"k2",
			&[("k1", 1, "retired"), ("k2", 2, "active"), ("k0", 0, "revoked")],
		));
		let summary = service.keyring_summary().unwrap();

		assert_eq!(summary.active_kid, "k2");
		assert_eq!(summary.count(KeyStatus::Active), 1);
		assert_eq!(summary.count(KeyStatus::Retired), 1);
		assert_eq!(summary.count(KeyStatus::Revoked), 1);
	}

	#[test]
	fn outcome_debug_redacts_plaintext() {
		let (_, service) = service(keyring_json("k1", &[("k1", 1, "active")]));
		let stored = service.seal_secret(&secret("hunter2-hunter2")).unwrap();
		let outcome = service.read_and_maybe_rewrap(&stored).unwrap();

		assert!(!format!("{outcome:?}").contains("hunter2"));
	}
}
