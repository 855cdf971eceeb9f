// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment lookup using the `VAR` / `VAR_FILE` convention.
//!
//! Unlike a plain "read the secret now" helper, [`locate_secret_env`] only
//! reports *where* the value lives. Callers that watch a file for changes
//! (the keyring loader in development mode) need the path, not a snapshot of
//! its contents.
//!
//! # Precedence
//!
//! 1. `{var}_FILE` set: the value lives in that file
//! 2. otherwise `{var}` set: the value is inline
//! 3. otherwise: not configured (`Ok(None)`)

use std::path::{Path, PathBuf};
use std::{env, fs};

use credvault_common_secret::SecretString;
use thiserror::Error;

/// Errors from environment lookup.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	/// Failed to read the referenced file.
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// `{var}_FILE` was set to an empty string.
	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Where a configured secret value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
	/// The value itself, taken from `{var}`.
	Inline(SecretString),
	/// A file holding the value, taken from `{var}_FILE`.
	File(PathBuf),
}

/// Locate a secret configured through `{var}` or `{var}_FILE`.
///
/// The file is not opened here; it may legitimately not exist yet.
pub fn locate_secret_env(var: &str) -> Result<Option<SecretSource>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		return Ok(Some(SecretSource::File(PathBuf::from(path))));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretSource::Inline(SecretString::new(value)))),
		_ => Ok(None),
	}
}

/// Read a secret file, stripping a single trailing newline.
pub fn read_secret_file(path: &Path) -> Result<SecretString, SecretEnvError> {
	let mut content = fs::read_to_string(path).map_err(|source| SecretEnvError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	if content.ends_with('\n') {
		content.pop();
		if content.ends_with('\r') {
			content.pop();
		}
	}
	Ok(SecretString::new(content))
}
