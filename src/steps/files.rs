// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File steps: incremental guard, renaming and writing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{is_contained, Asset, Step, StepContext, TaskReport};
use crate::cache::{is_up_to_date, matches_existing};
use crate::errors::{AssetflowError, AssetflowResult};

/// Drops assets whose output under `dest` is already at least as new
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewerStep {
    /// Destination directory the sources are compared against
    pub dest: PathBuf,
}

#[async_trait]
impl Step for NewerStep {
    fn name(&self) -> &'static str {
        "newer"
    }

    async fn apply(
        &self,
        assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        let dest = ctx.resolve(&self.dest);
        let before = assets.len();

        let fresh: Vec<Asset> = assets
            .into_iter()
            .filter(|asset| {
                let up_to_date = is_up_to_date(asset.modified, &dest.join(&asset.relative));
                if up_to_date {
                    tracing::debug!(file = %asset.relative.display(), "up to date");
                }
                !up_to_date
            })
            .collect();

        report.filtered += before - fresh.len();
        Ok(fresh)
    }
}

/// Renames assets
///
/// `name` replaces the whole file name. Otherwise `prefix` and `suffix` wrap
/// the stem and `extension` replaces the extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameStep {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub extension: Option<String>,
}

impl RenameStep {
    /// Compute the new relative path for `relative`
    pub fn rename(&self, relative: &std::path::Path) -> PathBuf {
        let parent = relative.parent().map(PathBuf::from).unwrap_or_default();

        if let Some(ref name) = self.name {
            return parent.join(name);
        }

        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = match self.extension {
            Some(ref ext) => Some(ext.trim_start_matches('.').to_string()),
            None => relative.extension().map(|e| e.to_string_lossy().to_string()),
        };

        let mut file_name = format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            stem,
            self.suffix.as_deref().unwrap_or("")
        );
        if let Some(ext) = extension.filter(|e| !e.is_empty()) {
            file_name.push('.');
            file_name.push_str(&ext);
        }

        parent.join(file_name)
    }
}

#[async_trait]
impl Step for RenameStep {
    fn name(&self) -> &'static str {
        "rename"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in &mut assets {
            asset.relative = self.rename(&asset.relative);
        }
        Ok(assets)
    }
}

/// Writes assets under a destination directory
///
/// Files whose existing content is identical are not rewritten. Assets pass
/// through unchanged so later steps can keep transforming them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestStep {
    pub dir: PathBuf,
}

#[async_trait]
impl Step for DestStep {
    fn name(&self) -> &'static str {
        "dest"
    }

    async fn apply(
        &self,
        assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        let dir = ctx.resolve(&self.dir);

        for asset in &assets {
            if !is_contained(&asset.relative) {
                return Err(AssetflowError::write(
                    dir.join(&asset.relative),
                    "path escapes the destination directory",
                ));
            }

            let target = dir.join(&asset.relative);
            if matches_existing(&target, &asset.contents) {
                report.unchanged += 1;
                continue;
            }

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AssetflowError::write(parent, e))?;
            }
            tokio::fs::write(&target, &asset.contents)
                .await
                .map_err(|e| AssetflowError::write(&target, e))?;

            tracing::debug!(task = ctx.task, file = %target.display(), "wrote");
            report.written += 1;
            report.outputs.push(
                target
                    .strip_prefix(ctx.root)
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| target.clone()),
            );
        }

        Ok(assets)
    }
}
