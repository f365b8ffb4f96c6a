// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Bundler backed by an external executable (esbuild-compatible flags)

use async_trait::async_trait;
use std::path::PathBuf;

use super::{BundleArtifact, BundleRequest, Bundler};
use crate::errors::AssetflowError;
use crate::pipeline::BundlerConfig;
use crate::utils::process::{find_tool, run_tool};

/// Command-line bundler
pub struct CommandBundler {
    command: String,
    extra_args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandBundler {
    /// Create a bundler from taskfile settings
    pub fn new(config: &BundlerConfig, working_dir: PathBuf) -> Self {
        Self {
            command: config.command.clone(),
            extra_args: config.args.clone(),
            working_dir,
        }
    }

    /// Arguments for bundling `request`
    pub fn bundle_args(&self, request: &BundleRequest) -> Vec<String> {
        let mut args = vec![
            request.entry.to_string_lossy().to_string(),
            "--bundle".to_string(),
            format!("--target={}", request.target),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Arguments for minifying a script read from stdin
    pub fn minify_args(&self) -> Vec<String> {
        vec!["--minify".to_string(), "--loader=js".to_string()]
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    fn name(&self) -> &str {
        &self.command
    }

    async fn bundle(&self, request: &BundleRequest) -> Result<BundleArtifact, AssetflowError> {
        let bin = find_tool(&self.command)?;
        let contents = run_tool(
            &self.command,
            &bin,
            &self.bundle_args(request),
            None,
            &self.working_dir,
        )
        .await?;

        Ok(BundleArtifact { contents })
    }

    async fn minify(&self, source: &[u8]) -> Result<Vec<u8>, AssetflowError> {
        let bin = find_tool(&self.command)?;
        run_tool(
            &self.command,
            &bin,
            &self.minify_args(),
            Some(source.to_vec()),
            &self.working_dir,
        )
        .await
    }

    async fn check_available(&self) -> bool {
        find_tool(&self.command).is_ok()
    }
}
