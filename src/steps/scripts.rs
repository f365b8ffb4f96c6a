// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Script steps, delegated to the configured bundler

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Asset, Step, StepContext, TaskReport};
use crate::bundler::BundleRequest;
use crate::errors::AssetflowResult;

/// Replaces the stream with a single bundle
///
/// Without an explicit `entry` the first asset in the stream is the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleStep {
    /// Entry module, relative to the project root
    #[serde(default)]
    pub entry: Option<PathBuf>,

    /// Output file name
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Language target preset
    #[serde(default = "default_target")]
    pub target: String,
}

impl Default for BundleStep {
    fn default() -> Self {
        Self {
            entry: None,
            filename: default_filename(),
            target: default_target(),
        }
    }
}

fn default_filename() -> String {
    "bundle.js".to_string()
}

fn default_target() -> String {
    "es2015".to_string()
}

#[async_trait]
impl Step for BundleStep {
    fn name(&self) -> &'static str {
        "bundle"
    }

    async fn apply(
        &self,
        assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        let (entry, base) = match (&self.entry, assets.first()) {
            (Some(entry), first) => (
                ctx.resolve(entry),
                first
                    .map(|a| a.base.clone())
                    .unwrap_or_else(|| ctx.root.to_path_buf()),
            ),
            (None, Some(first)) => (first.source_path(), first.base.clone()),
            (None, None) => return Ok(assets),
        };

        let request = BundleRequest {
            entry,
            target: self.target.clone(),
        };
        tracing::debug!(task = ctx.task, bundler = ctx.bundler.name(), entry = %request.entry.display(), "bundling");

        let artifact = ctx.bundler.bundle(&request).await?;
        Ok(vec![Asset::new(base, self.filename.as_str(), artifact.contents)])
    }
}

/// Minifies JavaScript assets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinifyJsStep {}

#[async_trait]
impl Step for MinifyJsStep {
    fn name(&self) -> &'static str {
        "minify_js"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in assets.iter_mut().filter(|a| a.has_extension(&["js", "mjs"])) {
            asset.contents = ctx.bundler.minify(&asset.contents).await?;
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::tests::StubBundler;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bundle_uses_first_asset_as_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/js")).unwrap();
        std::fs::write(dir.path().join("src/js/main.js"), "let a = 1;").unwrap();

        let bundler = StubBundler::default();
        let ctx = StepContext {
            task: "scripts",
            root: dir.path(),
            bundler: &bundler,
        };
        let assets = vec![Asset::new(dir.path().join("src/js"), "main.js", b"let a = 1;".to_vec())];

        let mut report = TaskReport::new("scripts");
        let out = BundleStep::default().apply(assets, &ctx, &mut report).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relative, PathBuf::from("bundle.js"));
        assert_eq!(out[0].text(), "/* es2015 */\nlet a = 1;");

        let requests = bundler.requests.lock().unwrap();
        assert_eq!(requests[0].entry, dir.path().join("src/js/main.js"));
    }

    #[tokio::test]
    async fn test_minify_js_only_touches_scripts() {
        let dir = TempDir::new().unwrap();
        let bundler = StubBundler::default();
        let ctx = StepContext {
            task: "scripts",
            root: dir.path(),
            bundler: &bundler,
        };
        let assets = vec![
            Asset::new(dir.path(), "bundle.min.js", b"let a = 1;".to_vec()),
            Asset::new(dir.path(), "notes.txt", b"a b".to_vec()),
        ];

        let mut report = TaskReport::new("scripts");
        let out = MinifyJsStep::default().apply(assets, &ctx, &mut report).await.unwrap();

        assert_eq!(out[0].contents, b"leta=1;");
        assert_eq!(out[1].contents, b"a b");
    }
}
