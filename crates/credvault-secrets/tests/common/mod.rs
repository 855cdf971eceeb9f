// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use credvault_common_config::ExecutionMode;
use credvault_secrets::{KeyringLoader, MemoryKeyringSource, SecretsService};
use serde_json::json;

/// Base64 of a KEK whose 32 bytes all equal `fill`.
pub fn kek_b64(fill: u8) -> String {
	BASE64.encode([fill; 32])
}

/// Keyring document from `(kid, fill byte, status)` triples.
pub fn keyring(active_kid: &str, keys: &[(&str, u8, &str)]) -> String {
	let keys: serde_json::Map<String, serde_json::Value> = keys
		.iter()
		.map(|(kid, fill, status)| {
			(
				kid.to_string(),
				json!({ "kek_b64": kek_b64(*fill), "status": status }),
			)
		})
		.collect();
	json!({ "active_kid": active_kid, "keys": keys }).to_string()
}

pub fn memory_service(
	document: String,
	mode: ExecutionMode,
) -> (Arc<MemoryKeyringSource>, SecretsService) {
	let source = Arc::new(MemoryKeyringSource::new(document));
	let loader = KeyringLoader::new(source.clone(), mode);
	(source, SecretsService::new(Arc::new(loader)))
}
