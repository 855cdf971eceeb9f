// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider Credential Envelopes
//!
//! This crate encrypts third-party provider API keys at rest:
//!
//! - **Keyring**: kid-indexed KEKs with active / retired / revoked status
//! - **Envelopes**: versioned, self-describing, stored as compact JSON
//! - **Lazy Rotation**: secrets move to the active key when next read
//!
//! # Security Design
//!
//! - The KEK never encrypts data; each envelope derives its own content key
//!   with HKDF-SHA256 over a fresh random salt
//! - XChaCha20-Poly1305 with a random 24-byte nonce and associated data
//!   `catai|v1|<kid>` binding the key-id
//! - Every decryption failure looks the same to the caller
//! - Plaintext is returned as [`SecretString`](credvault_common_secret::SecretString)
//!   and never logged

pub mod cipher;
pub mod config;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keyring;
pub mod loader;
pub mod rotation;
pub mod service;
pub mod source;

pub use cipher::{open, seal};
pub use config::{KeyringLocation, SecretsConfig};
pub use envelope::{Envelope, EnvelopeV1, APP_TAG};
pub use error::{SecretsError, SecretsResult};
pub use keyring::{Kek, KeySummary, KeyStatus, Keyring, KeyringSummary, KEK_SIZE};
pub use loader::KeyringLoader;
pub use rotation::{read_and_maybe_rewrap, Rewrap};
pub use service::{RewrapOutcome, SecretsService};
pub use source::{FileKeyringSource, KeyringSource, MemoryKeyringSource};
