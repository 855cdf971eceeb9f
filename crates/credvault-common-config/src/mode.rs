// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Execution mode of the running process.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Where the process is running.
///
/// Development and staging pick up edited configuration documents without a
/// restart. Production loads them once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExecutionMode {
	Development,
	Staging,
	#[default]
	Production,
}

/// Error returned for an unrecognised execution mode string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown execution mode {0:?}: expected development, staging or production")]
pub struct ParseModeError(pub String);

impl ExecutionMode {
	/// Whether documents should be re-checked for changes on every access.
	pub fn reloads_on_change(self) -> bool {
		matches!(self, ExecutionMode::Development | ExecutionMode::Staging)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			ExecutionMode::Development => "development",
			ExecutionMode::Staging => "staging",
			ExecutionMode::Production => "production",
		}
	}

	/// Read the mode from `var`, defaulting to production when unset or empty.
	pub fn from_env(var: &str) -> Result<Self, ParseModeError> {
		match std::env::var(var) {
			Ok(value) if !value.trim().is_empty() => value.parse(),
			_ => Ok(ExecutionMode::default()),
		}
	}
}

impl FromStr for ExecutionMode {
	type Err = ParseModeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(ExecutionMode::Development),
			"staging" | "stage" => Ok(ExecutionMode::Staging),
			"production" | "prod" => Ok(ExecutionMode::Production),
			_ => Err(ParseModeError(s.to_string())),
		}
	}
}

impl fmt::Display for ExecutionMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
