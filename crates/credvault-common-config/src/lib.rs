// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Common configuration primitives: execution mode and environment lookup.

pub mod env;
pub mod mode;

pub use env::{locate_secret_env, read_secret_file, SecretEnvError, SecretSource};
pub use mode::{ExecutionMode, ParseModeError};
