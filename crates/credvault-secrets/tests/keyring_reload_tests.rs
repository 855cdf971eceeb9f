// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use common::keyring;
use credvault_common_config::ExecutionMode;
use credvault_common_secret::SecretString;
use credvault_secrets::{Envelope, KeyringLocation, SecretsConfig, SecretsError};
use tempfile::TempDir;

/// Rewrite the keyring and push its mtime forward, as an operator's edit would.
fn rewrite(path: &Path, document: &str, age: Duration) {
	fs::write(path, document).unwrap();
	File::options()
		.write(true)
		.open(path)
		.unwrap()
		.set_modified(SystemTime::now() + age)
		.unwrap();
}

fn setup(mode: ExecutionMode) -> (TempDir, std::path::PathBuf, SecretsConfig) {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("keyring.json");
	fs::write(&path, keyring("k1", &[("k1", 1, "active")])).unwrap();
	let config = SecretsConfig::new(mode, KeyringLocation::File(path.clone()));
	(dir, path, config)
}

#[test]
fn test_development_picks_up_edited_keyring_file() {
	let (_dir, path, config) = setup(ExecutionMode::Development);
	let service = config.build_service().unwrap();
	let stored = service
		.seal_secret(&SecretString::new("provider-key".to_string()))
		.unwrap();

	rewrite(
		&path,
		&keyring("k2", &[("k1", 1, "retired"), ("k2", 2, "active")]),
		Duration::from_secs(5),
	);

	let outcome = service.read_and_maybe_rewrap(&stored).unwrap();
	assert_eq!(outcome.plaintext.expose(), "provider-key");
	let replacement = outcome.new_envelope.unwrap();
	assert_eq!(Envelope::from_json(&replacement).unwrap().kid(), "k2");
}

#[test]
fn test_production_ignores_edited_keyring_file() {
	let (_dir, path, config) = setup(ExecutionMode::Production);
	let service = config.build_service().unwrap();

	rewrite(
		&path,
		&keyring("k2", &[("k1", 1, "retired"), ("k2", 2, "active")]),
		Duration::from_secs(5),
	);

	assert_eq!(service.keyring_summary().unwrap().active_kid, "k1");
}

#[test]
fn test_broken_edit_fails_closed_then_recovers() {
	let (_dir, path, config) = setup(ExecutionMode::Development);
	let service = config.build_service().unwrap();
	let stored = service
		.seal_secret(&SecretString::new("provider-key".to_string()))
		.unwrap();

	rewrite(&path, "{ \"active_kid\": \"k1\", ", Duration::from_secs(5));
	assert!(matches!(
		service.open_secret(&stored),
		Err(SecretsError::Configuration(_))
	));

	rewrite(
		&path,
		&keyring("k1", &[("k1", 1, "active")]),
		Duration::from_secs(10),
	);
	assert_eq!(service.open_secret(&stored).unwrap().expose(), "provider-key");
}

#[test]
fn test_deleted_keyring_keeps_serving_cached_copy_in_development() {
	let (_dir, path, config) = setup(ExecutionMode::Development);
	let service = config.build_service().unwrap();
	let stored = service
		.seal_secret(&SecretString::new("provider-key".to_string()))
		.unwrap();

	fs::remove_file(&path).unwrap();

	assert_eq!(service.open_secret(&stored).unwrap().expose(), "provider-key");
}

#[test]
fn test_trailing_newline_in_keyring_file_is_accepted() {
	let (_dir, path, config) = setup(ExecutionMode::Production);
	fs::write(
		&path,
		format!("{}\n", keyring("k1", &[("k1", 1, "active")])),
	)
	.unwrap();

	assert_eq!(
		config.build_service().unwrap().keyring_summary().unwrap().active_kid,
		"k1"
	);
}
