// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline steps
//!
//! This module provides the step trait, the in-memory asset stream that steps
//! transform, and the implementations for every step type a taskfile can name.

mod css;
mod files;
mod html;
mod images;
mod scripts;
mod svg;

pub use css::{AutoprefixStep, BrowserTargets, MinifyCssStep, SassStep};
pub use files::{DestStep, NewerStep, RenameStep};
pub use html::{PartialsStep, TidyStep};
pub use images::{OptimizeImagesStep, PngCompression, WebpStep};
pub use scripts::{BundleStep, MinifyJsStep};
pub use svg::{SvgMinStep, SvgStoreStep};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::bundler::Bundler;
use crate::errors::{AssetflowError, AssetflowResult};

/// One file flowing through a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Glob base the file was matched under (absolute)
    pub base: PathBuf,
    /// Path relative to `base`; destinations mirror it
    pub relative: PathBuf,
    /// File contents
    pub contents: Vec<u8>,
    /// Source modification time, if the asset came from disk
    pub modified: Option<SystemTime>,
}

impl Asset {
    /// Create an in-memory asset
    pub fn new(base: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            base: base.into(),
            relative: relative.into(),
            contents,
            modified: None,
        }
    }

    /// Where the asset was read from (or would have been)
    pub fn source_path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    /// Lowercased file extension
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the extension is one of `exts`
    pub fn has_extension(&self, exts: &[&str]) -> bool {
        self.extension()
            .map(|e| exts.contains(&e.as_str()))
            .unwrap_or(false)
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Contents as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}

/// Statistics gathered while a task runs
#[derive(Debug, Clone, Default)]
pub struct TaskReport {
    /// Task name
    pub task: String,
    /// Files read from the source globs
    pub files_read: usize,
    /// Files written by `dest` steps
    pub written: usize,
    /// Files `dest` left alone because their content was identical
    pub unchanged: usize,
    /// Files dropped by an incremental guard
    pub filtered: usize,
    /// Paths removed by a clean task
    pub removed: usize,
    /// Paths written, relative to the project root
    pub outputs: Vec<PathBuf>,
    /// Wall clock time
    pub duration: Duration,
}

impl TaskReport {
    /// Create an empty report for `task`
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            ..Default::default()
        }
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.written > 0 {
            parts.push(format!("{} written", self.written));
        }
        if self.unchanged > 0 {
            parts.push(format!("{} unchanged", self.unchanged));
        }
        if self.filtered > 0 {
            parts.push(format!("{} up to date", self.filtered));
        }
        if self.removed > 0 {
            parts.push(format!("{} removed", self.removed));
        }
        parts.push(format!("{:.2}s", self.duration.as_secs_f64()));
        parts.join(", ")
    }
}

/// What a step can see besides its input
pub struct StepContext<'a> {
    /// Task the step belongs to
    pub task: &'a str,
    /// Project root; relative paths in step options resolve against it
    pub root: &'a Path,
    /// Bundler boundary for script steps
    pub bundler: &'a dyn Bundler,
}

impl StepContext<'_> {
    /// Resolve a taskfile path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Trait for pipeline steps
#[async_trait]
pub trait Step: Send + Sync {
    /// Step name as written in the taskfile
    fn name(&self) -> &'static str;

    /// Transform the asset stream
    ///
    /// # Arguments
    /// * `assets` - The stream produced by the previous step
    /// * `ctx` - Task, project root and shared services
    /// * `report` - Statistics for the running task
    async fn apply(
        &self,
        assets: Vec<Asset>,
        ctx: &StepContext<'_>,
        report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>>;
}

/// Expand `{a,b}` alternatives into separate patterns
///
/// Groups may nest (`{a,{b,c}}`); an unbalanced `{` is left as written.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let head = &pattern[..open];
    let tail = &pattern[close + 1..];

    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{head}{}{tail}", &pattern[w[0] + 1..w[1]])))
        .collect()
}

/// Whether a pattern contains glob wildcards
pub fn is_magic(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading directory of a pattern that contains no wildcards
///
/// A pattern without wildcards names a single file; its base is the parent
/// directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    if !is_magic(pattern) {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    let mut base = PathBuf::new();
    for component in path.components() {
        if is_magic(&component.as_os_str().to_string_lossy()) {
            break;
        }
        base.push(component);
    }
    base
}

/// Strip a leading `./`
pub fn normalize_pattern(pattern: &str) -> &str {
    pattern.strip_prefix("./").unwrap_or(pattern)
}

/// Resolve source patterns into assets, sorted by path
///
/// A pattern without wildcards that matches nothing is an error; a wildcard
/// pattern that matches nothing contributes no assets.
pub async fn resolve_sources(patterns: &[&str], root: &Path) -> AssetflowResult<Vec<Asset>> {
    let mut matched: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for raw in patterns {
        let pattern = normalize_pattern(raw);

        for expanded in expand_braces(pattern) {
            let base = root.join(glob_base(&expanded));
            let full_pattern = if Path::new(&expanded).is_absolute() {
                expanded.clone()
            } else {
                // The root is a literal path; only the pattern may carry wildcards
                Path::new(&glob::Pattern::escape(&root.to_string_lossy()))
                    .join(&expanded)
                    .to_string_lossy()
                    .to_string()
            };

            let mut count = 0;
            for entry in glob::glob(&full_pattern)? {
                let Ok(path) = entry else { continue };
                if !path.is_file() {
                    continue;
                }
                count += 1;
                matched.entry(path).or_insert_with(|| base.clone());
            }

            if count == 0 {
                if is_magic(&expanded) {
                    tracing::warn!(pattern = %expanded, "pattern matched no files");
                } else {
                    return Err(AssetflowError::NoInputFiles {
                        pattern: raw.to_string(),
                    });
                }
            }
        }
    }

    let mut assets = Vec::with_capacity(matched.len());
    for (path, base) in matched {
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|e| AssetflowError::read(&path, e))?;
        let modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok());
        let relative = path
            .strip_prefix(&base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));

        assets.push(Asset {
            base,
            relative,
            contents,
            modified,
        });
    }

    Ok(assets)
}

/// Reject paths that climb out of the directory they are joined to
pub fn is_contained(path: &Path) -> bool {
    !path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_braces() {
        assert_eq!(
            expand_braces("src/img/**/*.{png,jpg,jpeg}"),
            vec!["src/img/**/*.png", "src/img/**/*.jpg", "src/img/**/*.jpeg"]
        );
        assert_eq!(expand_braces("a/{b,c}/{d,e}").len(), 4);
        assert_eq!(expand_braces("plain/*.txt"), vec!["plain/*.txt"]);
    }

    #[test]
    fn test_expand_nested_braces() {
        assert_eq!(expand_braces("*.{css,{scss,sass}}"), vec!["*.css", "*.scss", "*.sass"]);
        assert_eq!(expand_braces("src/{a"), vec!["src/{a"]);
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/img/**/*"), PathBuf::from("src/img"));
        assert_eq!(glob_base("src/scss/styles.scss"), PathBuf::from("src/scss"));
        assert_eq!(glob_base("*.txt"), PathBuf::new());
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("img/logo.png")));
        assert!(!is_contained(Path::new("../escape.txt")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }

    #[tokio::test]
    async fn test_resolve_sources_keeps_layout_and_order() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/img/icons")).unwrap();
        std::fs::write(dir.path().join("src/img/b.png"), b"b").unwrap();
        std::fs::write(dir.path().join("src/img/a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("src/img/icons/x.svg"), b"x").unwrap();

        let assets = resolve_sources(&["./src/img/**/*"], dir.path()).await.unwrap();
        let relative: Vec<_> = assets.iter().map(|a| a.relative.clone()).collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("icons/x.svg"),
            ]
        );
        assert!(assets.iter().all(|a| a.modified.is_some()));
    }

    #[tokio::test]
    async fn test_resolve_sources_with_braces() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/a.png"), b"a").unwrap();
        std::fs::write(dir.path().join("img/b.gif"), b"b").unwrap();

        let assets = resolve_sources(&["img/*.{png,jpg}"], dir.path()).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].relative, PathBuf::from("a.png"));
    }

    #[tokio::test]
    async fn test_root_with_glob_characters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("site [v2]");
        std::fs::create_dir_all(root.join("src/scss")).unwrap();
        std::fs::write(root.join("src/scss/styles.scss"), b"a {}").unwrap();
        std::fs::write(root.join("src/index.html"), b"<p></p>").unwrap();

        let styles = resolve_sources(&["src/scss/styles.scss"], &root).await.unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].relative, PathBuf::from("styles.scss"));

        let pages = resolve_sources(&["src/*.html"], &root).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].base, root.join("src"));
    }

    #[tokio::test]
    async fn test_missing_literal_source_fails() {
        let dir = TempDir::new().unwrap();
        let err = resolve_sources(&["src/js/main.js"], dir.path()).await.unwrap_err();
        assert!(matches!(err, AssetflowError::NoInputFiles { .. }));
    }

    #[tokio::test]
    async fn test_empty_wildcard_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let assets = resolve_sources(&["nothing/**/*.svg"], dir.path()).await.unwrap();
        assert!(assets.is_empty());
    }

    #[test]
    fn test_report_summary() {
        let mut report = TaskReport::new("images");
        report.written = 2;
        report.filtered = 3;
        assert!(report.summary().starts_with("2 written, 3 up to date"));
    }
}
