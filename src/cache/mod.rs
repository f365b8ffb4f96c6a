// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Incremental build support
//!
//! Decides when work can be skipped: sources that are not newer than their
//! output, and outputs whose content would not change.

mod freshness;
mod hash;

pub use freshness::{is_up_to_date, matches_existing};
pub use hash::{hash_bytes, hash_file};
