// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Style steps
//!
//! SCSS compilation is delegated to an external `sass` executable; prefixing
//! and minification are delegated to lightningcss.

use async_trait::async_trait;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Asset, Step, StepContext, TaskReport};
use crate::errors::{AssetflowError, AssetflowResult};
use crate::utils::process::{find_tool, run_tool};

/// Browser versions CSS output must support
///
/// Versions are written as `"major"` or `"major.minor"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserTargets {
    pub chrome: Option<String>,
    pub edge: Option<String>,
    pub firefox: Option<String>,
    pub safari: Option<String>,
    pub ios_saf: Option<String>,
    pub samsung: Option<String>,
    pub opera: Option<String>,
    pub android: Option<String>,
    pub ie: Option<String>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: Some("90".into()),
            edge: Some("90".into()),
            firefox: Some("88".into()),
            safari: Some("14".into()),
            ios_saf: Some("14".into()),
            samsung: Some("14".into()),
            opera: None,
            android: None,
            ie: None,
        }
    }
}

impl BrowserTargets {
    /// Convert to lightningcss targets
    pub fn to_targets(&self) -> AssetflowResult<Targets> {
        let browsers = Browsers {
            chrome: parse_version("chrome", &self.chrome)?,
            edge: parse_version("edge", &self.edge)?,
            firefox: parse_version("firefox", &self.firefox)?,
            safari: parse_version("safari", &self.safari)?,
            ios_saf: parse_version("ios_saf", &self.ios_saf)?,
            samsung: parse_version("samsung", &self.samsung)?,
            opera: parse_version("opera", &self.opera)?,
            android: parse_version("android", &self.android)?,
            ie: parse_version("ie", &self.ie)?,
        };
        Ok(Targets::from(browsers))
    }
}

/// Encode `major[.minor[.patch]]` the way lightningcss expects
fn parse_version(browser: &str, version: &Option<String>) -> AssetflowResult<Option<u32>> {
    let Some(version) = version else {
        return Ok(None);
    };

    let mut parts = [0u32; 3];
    for (i, part) in version.trim().split('.').enumerate() {
        if i >= 3 {
            break;
        }
        parts[i] = part.parse().map_err(|_| AssetflowError::InvalidTaskfile {
            reason: format!("invalid {} version '{}'", browser, version),
            help: Some("Use a version like \"90\" or \"14.1\"".into()),
        })?;
    }

    Ok(Some((parts[0] << 16) | (parts[1] << 8) | parts[2]))
}

/// Run a stylesheet through lightningcss
pub fn process_css(
    source: &str,
    filename: &str,
    targets: Targets,
    minify: bool,
) -> Result<String, String> {
    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(result.code)
}

fn transform_css(
    assets: &mut [Asset],
    targets: &BrowserTargets,
    minify: bool,
) -> AssetflowResult<()> {
    let targets = targets.to_targets()?;

    for asset in assets.iter_mut().filter(|a| a.has_extension(&["css"])) {
        let filename = asset.relative.to_string_lossy().to_string();
        let code = process_css(&asset.text(), &filename, targets.clone(), minify).map_err(
            |message| AssetflowError::TransformFailed {
                path: asset.source_path(),
                message,
            },
        )?;
        asset.contents = code.into_bytes();
    }

    Ok(())
}

/// Compiles SCSS/Sass with an external compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SassStep {
    /// Compiler executable
    #[serde(default = "default_sass")]
    pub command: String,

    /// Extra load paths, relative to the project root
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,

    /// Output style (`expanded` or `compressed`)
    #[serde(default = "default_style")]
    pub style: String,
}

impl Default for SassStep {
    fn default() -> Self {
        Self {
            command: default_sass(),
            load_paths: vec![],
            style: default_style(),
        }
    }
}

fn default_sass() -> String {
    "sass".to_string()
}

fn default_style() -> String {
    "expanded".to_string()
}

impl SassStep {
    fn args(&self, asset: &Asset, ctx: &StepContext<'_>) -> Vec<String> {
        let mut args = vec![
            "--stdin".to_string(),
            "--no-source-map".to_string(),
            format!("--style={}", self.style),
        ];
        if asset.has_extension(&["sass"]) {
            args.push("--indented".to_string());
        }

        let source = asset.source_path();
        if let Some(dir) = source.parent() {
            args.push(format!("--load-path={}", dir.display()));
        }
        for path in &self.load_paths {
            args.push(format!("--load-path={}", ctx.resolve(path).display()));
        }
        args
    }
}

/// Files starting with `_` are imported by others, never compiled on their own
fn is_sass_partial(relative: &Path) -> bool {
    relative
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('_'))
        .unwrap_or(false)
}

#[async_trait]
impl Step for SassStep {
    fn name(&self) -> &'static str {
        "sass"
    }

    async fn apply(
        &self,
        assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        let needs_compiler = assets
            .iter()
            .any(|a| a.has_extension(&["scss", "sass"]) && !is_sass_partial(&a.relative));
        let bin = if needs_compiler {
            Some(find_tool(&self.command)?)
        } else {
            None
        };

        let mut out = Vec::with_capacity(assets.len());
        for mut asset in assets {
            if !asset.has_extension(&["scss", "sass"]) {
                out.push(asset);
                continue;
            }
            let (false, Some(bin)) = (is_sass_partial(&asset.relative), bin.as_ref()) else {
                continue;
            };

            let args = self.args(&asset, ctx);
            let css = run_tool(
                &self.command,
                bin,
                &args,
                Some(std::mem::take(&mut asset.contents)),
                ctx.root,
            )
            .await?;

            asset.contents = css;
            asset.relative.set_extension("css");
            out.push(asset);
        }

        Ok(out)
    }
}

/// Adds vendor prefixes for the configured browsers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoprefixStep {
    #[serde(default)]
    pub targets: BrowserTargets,
}

#[async_trait]
impl Step for AutoprefixStep {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        transform_css(&mut assets, &self.targets, false)?;
        Ok(assets)
    }
}

/// Minifies CSS
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinifyCssStep {
    #[serde(default)]
    pub targets: BrowserTargets,
}

#[async_trait]
impl Step for MinifyCssStep {
    fn name(&self) -> &'static str {
        "minify_css"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        transform_css(&mut assets, &self.targets, true)?;
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("chrome", &Some("90".into())).unwrap(), Some(90 << 16));
        assert_eq!(
            parse_version("safari", &Some("14.1".into())).unwrap(),
            Some((14 << 16) | (1 << 8))
        );
        assert_eq!(parse_version("ie", &None).unwrap(), None);
        assert!(parse_version("chrome", &Some("latest".into())).is_err());
    }

    #[test]
    fn test_minify_css() {
        let targets = BrowserTargets::default().to_targets().unwrap();
        let out = process_css(".a {\n  color: #ff0000;\n}\n", "a.css", targets, true).unwrap();
        assert_eq!(out, ".a{color:red}");
    }

    #[test]
    fn test_autoprefix_adds_prefixes_for_old_browsers() {
        let targets = BrowserTargets {
            safari: Some("8".into()),
            ..BrowserTargets::default()
        };
        let out = process_css(
            ".a { user-select: none; }",
            "a.css",
            targets.to_targets().unwrap(),
            false,
        )
        .unwrap();
        assert!(out.contains("-webkit-user-select"));
    }

    #[test]
    fn test_transform_only_touches_css() {
        let mut assets = vec![
            Asset::new("/src", "a.css", b".a { color: #ff0000; }".to_vec()),
            Asset::new("/src", "b.txt", b"keep me".to_vec()),
        ];
        transform_css(&mut assets, &BrowserTargets::default(), true).unwrap();
        assert_eq!(assets[0].contents, b".a{color:red}");
        assert_eq!(assets[1].contents, b"keep me");
    }

    #[test]
    fn test_sass_partials_are_skipped() {
        assert!(is_sass_partial(Path::new("scss/_vars.scss")));
        assert!(!is_sass_partial(Path::new("scss/styles.scss")));
    }
}
