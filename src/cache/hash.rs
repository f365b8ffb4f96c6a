// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Content hashing
//!
//! Uses BLAKE3 for fast content comparison.

use blake3::Hasher;
use std::path::Path;

use crate::errors::AssetflowError;

/// Compute the hash of a byte slice
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

/// Compute the hash of a file's contents
pub fn hash_file(path: &Path) -> Result<String, AssetflowError> {
    let content = std::fs::read(path).map_err(|e| AssetflowError::read(path, e))?;
    Ok(hash_bytes(&content))
}
