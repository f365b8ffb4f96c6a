// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Output freshness checks

use std::path::Path;
use std::time::SystemTime;

use super::hash::{hash_bytes, hash_file};

/// Whether `target` exists and is at least as new as a source modified at `source_modified`
///
/// Assets without a known modification time are never considered up to date.
pub fn is_up_to_date(source_modified: Option<SystemTime>, target: &Path) -> bool {
    let Some(source_modified) = source_modified else {
        return false;
    };

    match std::fs::metadata(target).and_then(|m| m.modified()) {
        Ok(target_modified) => target_modified >= source_modified,
        Err(_) => false,
    }
}

/// Whether `target` already holds exactly `contents`
pub fn matches_existing(target: &Path, contents: &[u8]) -> bool {
    match std::fs::metadata(target) {
        Ok(meta) if meta.is_file() && meta.len() == contents.len() as u64 => {}
        _ => return false,
    }

    hash_file(target)
        .map(|existing| existing == hash_bytes(contents))
        .unwrap_or(false)
}
