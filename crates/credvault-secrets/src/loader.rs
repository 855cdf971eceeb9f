// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide keyring cache.
//!
//! The validated [`Keyring`] is held as an immutable snapshot behind an
//! [`ArcSwapOption`]. Readers take a snapshot without locking; a reload
//! builds a complete new snapshot and swaps it in, so a concurrent reader
//! sees either the old keyring or the new one, never a mix.
//!
//! Invalidation depends on [`ExecutionMode`]:
//!
//! - development / staging: the source's modification time is compared on
//!   every access and the document is reloaded once it has advanced
//! - production: loaded once; operators restart to pick up a new keyring

use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use credvault_common_config::ExecutionMode;
use tracing::{debug, error, info, warn};

use crate::error::SecretsResult;
use crate::keyring::{Kek, KeyStatus, Keyring};
use crate::source::KeyringSource;

struct CachedKeyring {
	keyring: Arc<Keyring>,
	modified: Option<SystemTime>,
}

/// Loads, validates and caches the keyring document.
pub struct KeyringLoader {
	source: Arc<dyn KeyringSource>,
	mode: ExecutionMode,
	cache: ArcSwapOption<CachedKeyring>,
	/// Serializes reloads. Never taken on the cached read path.
	reload_lock: Mutex<()>,
}

impl KeyringLoader {
	pub fn new(source: Arc<dyn KeyringSource>, mode: ExecutionMode) -> Self {
		Self {
			source,
			mode,
			cache: ArcSwapOption::empty(),
			reload_lock: Mutex::new(()),
		}
	}

	pub fn mode(&self) -> ExecutionMode {
		self.mode
	}

	/// The current validated keyring snapshot.
	///
	/// Operations that resolve more than one key should resolve them all
	/// against a single snapshot.
	pub fn keyring(&self) -> SecretsResult<Arc<Keyring>> {
		if let Some(cached) = self.cache.load_full() {
			if !self.is_stale(&cached) {
				return Ok(Arc::clone(&cached.keyring));
			}
		}
		self.reload()
	}

	/// The kid and KEK used for new encryptions.
	pub fn resolve_active(&self) -> SecretsResult<(String, Kek)> {
		let keyring = self.keyring()?;
		let (kid, kek) = keyring.resolve_active()?;
		Ok((kid.to_string(), kek.clone()))
	}

	/// The KEK for `kid`; active or retired, never revoked.
	pub fn resolve(&self, kid: &str) -> SecretsResult<Kek> {
		let keyring = self.keyring()?;
		keyring.resolve(kid).cloned()
	}

	/// Drop the cached keyring; the next access reads the source again.
	pub fn invalidate(&self) {
		self.cache.store(None);
		debug!(source = %self.source.describe(), "Keyring cache invalidated");
	}

	fn is_stale(&self, cached: &CachedKeyring) -> bool {
		if !self.mode.reloads_on_change() {
			return false;
		}

		match self.source.modified() {
			Ok(Some(current)) => cached.modified.map_or(true, |loaded| current > loaded),
			Ok(None) => false,
			Err(e) => {
				warn!(
					source = %self.source.describe(),
					error = %e,
					"Cannot check keyring for changes; serving cached keyring"
				);
				false
			}
		}
	}

	fn reload(&self) -> SecretsResult<Arc<Keyring>> {
		let _guard = self
			.reload_lock
			.lock()
			.unwrap_or_else(PoisonError::into_inner);

		// Another caller may have finished a reload while we waited.
		if let Some(cached) = self.cache.load_full() {
			if !self.is_stale(&cached) {
				return Ok(Arc::clone(&cached.keyring));
			}
		}

		// Taken before the read: an edit landing mid-read triggers another reload.
		let modified = self.source.modified().ok().flatten();

		match self
			.source
			.read()
			.and_then(|document| Keyring::from_json(&document))
		{
			Ok(keyring) => {
				let keyring = Arc::new(keyring);
				let summary = keyring.summary();
				info!(
					source = %self.source.describe(),
					mode = %self.mode,
					active_kid = %summary.active_kid,
					version = ?summary.version,
					active = summary.count(KeyStatus::Active),
					retired = summary.count(KeyStatus::Retired),
					revoked = summary.count(KeyStatus::Revoked),
					"Loaded keyring"
				);
				self.cache.store(Some(Arc::new(CachedKeyring {
					keyring: Arc::clone(&keyring),
					modified,
				})));
				Ok(keyring)
			}
			Err(e) => {
				// Never keep serving a keyring the operator has replaced.
				self.cache.store(None);
				error!(source = %self.source.describe(), error = %e, "Keyring failed to load");
				Err(e)
			}
		}
	}
}

impl std::fmt::Debug for KeyringLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyringLoader")
			.field("source", &self.source.describe())
			.field("mode", &self.mode)
			.field("loaded", &self.cache.load().is_some())
			.finish()
	}
}
