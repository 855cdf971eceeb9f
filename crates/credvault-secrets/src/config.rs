// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the secrets system.
//!
//! Selects the execution mode and where the keyring document lives, then
//! wires a [`KeyringLoader`] and [`SecretsService`] from them. The envelope
//! code never reads the environment itself.

use std::path::PathBuf;
use std::sync::Arc;

use credvault_common_config::{locate_secret_env, ExecutionMode, SecretSource};
use credvault_common_secret::SecretString;
use tracing::{info, instrument};

use crate::error::{SecretsError, SecretsResult};
use crate::loader::KeyringLoader;
use crate::service::SecretsService;
use crate::source::{FileKeyringSource, KeyringSource, MemoryKeyringSource};

/// Selects development, staging or production behaviour.
pub const ENV_MODE: &str = "CREDVAULT_ENV";

/// Inline keyring JSON; `CREDVAULT_KEYRING_FILE` names a file instead and
/// takes precedence.
pub const ENV_KEYRING: &str = "CREDVAULT_KEYRING";

/// Where the keyring document is read from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyringLocation {
	File(PathBuf),
	/// The whole document, held in memory. Never reloaded.
	Inline(SecretString),
}

impl From<SecretSource> for KeyringLocation {
	fn from(source: SecretSource) -> Self {
		match source {
			SecretSource::File(path) => KeyringLocation::File(path),
			SecretSource::Inline(document) => KeyringLocation::Inline(document),
		}
	}
}

impl std::fmt::Debug for KeyringLocation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			KeyringLocation::File(path) => f.debug_tuple("File").field(path).finish(),
			KeyringLocation::Inline(_) => f.debug_tuple("Inline").field(&"[REDACTED]").finish(),
		}
	}
}

/// Configuration for the secrets system.
#[derive(Debug, Clone)]
pub struct SecretsConfig {
	mode: ExecutionMode,
	location: KeyringLocation,
}

impl SecretsConfig {
	pub fn new(mode: ExecutionMode, location: KeyringLocation) -> Self {
		Self { mode, location }
	}

	/// Load configuration from environment variables.
	///
	/// Environment variables:
	/// - `CREDVAULT_ENV` - `development`, `staging` or `production` (default)
	/// - `CREDVAULT_KEYRING_FILE` - Path to the keyring document
	/// - `CREDVAULT_KEYRING` - Keyring document as inline JSON
	#[instrument(skip_all)]
	pub fn from_env() -> SecretsResult<Self> {
		let mode = ExecutionMode::from_env(ENV_MODE)?;
		let location = locate_secret_env(ENV_KEYRING)?
			.ok_or_else(|| {
				SecretsError::Configuration(format!(
					"keyring not configured: set {ENV_KEYRING}_FILE or {ENV_KEYRING}"
				))
			})?
			.into();

		Ok(Self::new(mode, location))
	}

	pub fn mode(&self) -> ExecutionMode {
		self.mode
	}

	pub fn location(&self) -> &KeyringLocation {
		&self.location
	}

	/// Build a loader over the configured location. Nothing is read yet.
	pub fn build_loader(&self) -> KeyringLoader {
		let source: Arc<dyn KeyringSource> = match &self.location {
			KeyringLocation::File(path) => Arc::new(FileKeyringSource::new(path.clone())),
			KeyringLocation::Inline(document) => Arc::new(MemoryKeyringSource::from(document)),
		};
		KeyringLoader::new(source, self.mode)
	}

	/// Build the service and load the keyring once, so a missing or invalid
	/// keyring fails at startup rather than on the first request.
	pub fn build_service(&self) -> SecretsResult<SecretsService> {
		let loader = Arc::new(self.build_loader());
		let summary = loader.keyring()?.summary();
		info!(
			mode = %self.mode,
			active_kid = %summary.active_kid,
			keys = summary.keys.len(),
			"Secrets service ready"
		);
		Ok(SecretsService::new(loader))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keyring::test_support::keyring_json;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn inline(document: String) -> KeyringLocation {
		KeyringLocation::Inline(SecretString::new(document))
	}

	#[test]
	fn inline_location_builds_service() {
		let config = SecretsConfig::new(
			ExecutionMode::Production,
			inline(keyring_json("k1", &[("k1", 1, "active")])),
		);
		let service = config.build_service().unwrap();

		let stored = service
			.seal_secret(&SecretString::new("provider-key".to_string()))
			.unwrap();
		assert_eq!(service.open_secret(&stored).unwrap().expose(), "provider-key");
	}

	#[test]
	fn file_location_builds_service() {
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "{}", keyring_json("k1", &[("k1", 1, "active")])).unwrap();

		let config = SecretsConfig::new(
			ExecutionMode::Development,
			KeyringLocation::File(file.path().to_path_buf()),
		);
		assert_eq!(config.build_service().unwrap().keyring_summary().unwrap().active_kid, "k1");
	}

	#[test]
	fn invalid_keyring_fails_at_startup() {
		let config = SecretsConfig::new(ExecutionMode::Production, inline("[]".to_string()));
		assert!(matches!(
			config.build_service(),
			Err(SecretsError::Configuration(_))
		));
	}

	#[test]
	fn missing_file_fails_at_startup() {
		let config = SecretsConfig::new(
			ExecutionMode::Production,
			KeyringLocation::File("/nonexistent/credvault/keyring.json".into()),
		);
		assert!(matches!(
			config.build_service(),
			Err(SecretsError::Configuration(_))
		));
	}

	#[test]
	fn debug_redacts_inline_document() {
		let config = SecretsConfig::new(
			ExecutionMode::Production,
			inline(keyring_json("k1", &[("k1", 1, "active")])),
		);
		let debug = format!("{config:?}");
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains("kek_b64"));
	}

	// All environment cases live in one test; the variables are process-wide.
	#[test]
	fn from_env_reads_mode_and_location() {
		let file_var = format!("{ENV_KEYRING}_FILE");
		std::env::remove_var(ENV_MODE);
		std::env::remove_var(ENV_KEYRING);
		std::env::remove_var(&file_var);

		assert!(matches!(
			SecretsConfig::from_env(),
			Err(SecretsError::Configuration(ref msg)) if msg.contains("not configured")
		));

		std::env::set_var(ENV_KEYRING, keyring_json("k1", &[("k1", 1, "active")]));
		let config = SecretsConfig::from_env().unwrap();
		assert_eq!(config.mode(), ExecutionMode::Production);
		assert!(matches!(config.location(), KeyringLocation::Inline(_)));

		std::env::set_var(&file_var, "/etc/credvault/keyring.json");
		std::env::set_var(ENV_MODE, "dev");
		let config = SecretsConfig::from_env().unwrap();
		assert_eq!(config.mode(), ExecutionMode::Development);
		assert_eq!(
			config.location(),
			&KeyringLocation::File("/etc/credvault/keyring.json".into())
		);

		std::env::set_var(ENV_MODE, "qa");
		assert!(matches!(
			SecretsConfig::from_env(),
			Err(SecretsError::Configuration(_))
		));

		std::env::remove_var(ENV_MODE);
		std::env::remove_var(ENV_KEYRING);
		std::env::remove_var(&file_var);
	}
}
