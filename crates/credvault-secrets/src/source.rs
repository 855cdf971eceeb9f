// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the keyring document comes from.
//!
//! The loader never looks at global state: it is handed a [`KeyringSource`].
//! Production deployments use [`FileKeyringSource`]; tests and inline
//! configuration use [`MemoryKeyringSource`].

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use credvault_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Provider of the raw keyring document.
pub trait KeyringSource: Send + Sync {
	/// Read the full document.
	fn read(&self) -> SecretsResult<Zeroizing<Vec<u8>>>;

	/// When the document last changed, if this source can tell.
	///
	/// Sources returning `None` are never reloaded automatically.
	fn modified(&self) -> SecretsResult<Option<SystemTime>>;

	/// Human-readable location for logs. Must not contain key material.
	fn describe(&self) -> String;
}

/// Keyring document stored in a file.
#[derive(Debug, Clone)]
pub struct FileKeyringSource {
	path: PathBuf,
}

impl FileKeyringSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl KeyringSource for FileKeyringSource {
	fn read(&self) -> SecretsResult<Zeroizing<Vec<u8>>> {
		let content = credvault_common_config::read_secret_file(&self.path)
			.map_err(|e| SecretsError::Configuration(format!("keyring not accessible: {e}")))?;
		Ok(Zeroizing::new(content.expose().as_bytes().to_vec()))
	}

	fn modified(&self) -> SecretsResult<Option<SystemTime>> {
		std::fs::metadata(&self.path)
			.and_then(|meta| meta.modified())
			.map(Some)
			.map_err(|e| {
				SecretsError::Configuration(format!(
					"cannot stat keyring at {}: {e}",
					self.path.display()
				))
			})
	}

	fn describe(&self) -> String {
		format!("file:{}", self.path.display())
	}
}

struct MemoryDocument {
	bytes: Zeroizing<Vec<u8>>,
	modified: SystemTime,
}

/// Keyring document held in memory.
///
/// [`MemoryKeyringSource::replace`] swaps the document and strictly advances
/// its modification time, so development-mode loaders see every replacement
/// even when two happen within the clock's resolution.
pub struct MemoryKeyringSource {
	document: ArcSwap<MemoryDocument>,
}

impl MemoryKeyringSource {
	pub fn new(document: impl Into<Vec<u8>>) -> Self {
		Self {
			document: ArcSwap::from_pointee(MemoryDocument {
				bytes: Zeroizing::new(document.into()),
				modified: SystemTime::now(),
			}),
		}
	}

	/// Replace the document, as an operator editing the keyring would.
	pub fn replace(&self, document: impl Into<Vec<u8>>) {
		let bytes = Zeroizing::new(document.into());
		self.document.rcu(|current| {
			let now = SystemTime::now();
			let modified = if now > current.modified {
				now
			} else {
				current.modified + Duration::from_nanos(1)
			};
			MemoryDocument {
				bytes: bytes.clone(),
				modified,
			}
		});
	}
}

impl From<&SecretString> for MemoryKeyringSource {
	fn from(document: &SecretString) -> Self {
		Self::new(document.expose().as_bytes())
	}
}

impl KeyringSource for MemoryKeyringSource {
	fn read(&self) -> SecretsResult<Zeroizing<Vec<u8>>> {
		Ok(self.document.load().bytes.clone())
	}

	fn modified(&self) -> SecretsResult<Option<SystemTime>> {
		Ok(Some(self.document.load().modified))
	}

	fn describe(&self) -> String {
		"memory".to_string()
	}
}

impl std::fmt::Debug for MemoryKeyringSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryKeyringSource")
			.field("document", &"[REDACTED]")
			.field("modified", &self.document.load().modified)
			.finish()
	}
}
