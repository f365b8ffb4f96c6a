// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! JavaScript bundler boundary
//!
//! Bundling is an opaque external step: an entry file and a target preset go
//! in, a single bundled artifact comes out.

mod command;

pub use command::CommandBundler;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::AssetflowError;

/// What to bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    /// Entry module (absolute path)
    pub entry: PathBuf,
    /// Language target preset, e.g. `es2015`
    pub target: String,
}

/// A bundled script
#[derive(Debug, Clone)]
pub struct BundleArtifact {
    pub contents: Vec<u8>,
}

/// Trait for bundler implementations
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundler name for messages
    fn name(&self) -> &str;

    /// Bundle `request.entry` and everything it imports
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleArtifact, AssetflowError>;

    /// Minify a single script
    async fn minify(&self, source: &[u8]) -> Result<Vec<u8>, AssetflowError>;

    /// Check if the bundler can be invoked
    async fn check_available(&self) -> bool;
}
