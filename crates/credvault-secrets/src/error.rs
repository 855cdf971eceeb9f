// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the secret envelope subsystem.

use thiserror::Error;

/// Result type alias for secrets operations.
pub type SecretsResult<T> = Result<T, SecretsError>;

/// Errors that can occur while sealing, opening or re-wrapping secrets.
#[derive(Debug, Error)]
pub enum SecretsError {
	// =========================================================================
	// Configuration Errors
	// =========================================================================
	/// Keyring missing, unparsable or structurally invalid.
	#[error("configuration error: {0}")]
	Configuration(String),

	// =========================================================================
	// Key Resolution Errors
	// =========================================================================
	/// The kid has no entry, or its entry is revoked.
	#[error("no usable key for kid {0:?}")]
	KeyNotFound(String),

	// =========================================================================
	// Envelope Errors
	// =========================================================================
	/// Carries the raw `v` value as JSON text.
	#[error("unsupported envelope version: {0}")]
	UnsupportedVersion(String),

	/// Authentication failed or the envelope is corrupt.
	///
	/// Deliberately carries no detail: callers must not be able to tell a
	/// wrong key from a tampered ciphertext.
	#[error("secret decryption failed")]
	DecryptionFailed,

	#[error("decrypted secret is not valid UTF-8")]
	InvalidPlaintext,

	// =========================================================================
	// Internal Errors
	// =========================================================================
	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("key derivation failed: {0}")]
	KeyDerivation(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl SecretsError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			SecretsError::Configuration(_)
				| SecretsError::Encryption(_)
				| SecretsError::KeyDerivation(_)
				| SecretsError::Internal(_)
		)
	}

	/// Returns the HTTP status code the enclosing endpoint should answer with.
	pub fn status_code(&self) -> u16 {
		match self {
			// 404 Not Found
			SecretsError::KeyNotFound(_) => 404,

			// 422 Unprocessable Entity - stored envelope cannot be used
			SecretsError::UnsupportedVersion(_)
			| SecretsError::DecryptionFailed
			| SecretsError::InvalidPlaintext => 422,

			// 500 Internal Server Error
			SecretsError::Configuration(_)
			| SecretsError::Encryption(_)
			| SecretsError::KeyDerivation(_)
			| SecretsError::Internal(_) => 500,
		}
	}
}

impl From<credvault_common_config::SecretEnvError> for SecretsError {
	fn from(err: credvault_common_config::SecretEnvError) -> Self {
		SecretsError::Configuration(err.to_string())
	}
}

impl From<credvault_common_config::ParseModeError> for SecretsError {
	fn from(err: credvault_common_config::ParseModeError) -> Self {
		SecretsError::Configuration(err.to_string())
	}
}
