// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! HTML steps
//!
//! `partials` expands include blocks of the form
//!
//! ```html
//! <!-- partial:partials/header.html -->
//! anything here is replaced
//! <!-- partial -->
//! ```
//!
//! with the named file, resolved relative to the including file. Partials may
//! include other partials.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{Asset, Step, StepContext, TaskReport};
use crate::errors::{AssetflowError, AssetflowResult};

const MAX_PARTIAL_DEPTH: usize = 32;

fn partial_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!--\s*partial:\s*(\S+?)\s*-->(.*?)<!--\s*partial\s*-->")
            .expect("partial block pattern is valid")
    })
}

/// Expands partial include blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialsStep {
    /// Drop the marker comments around injected content
    #[serde(default)]
    pub remove_tags: bool,
}

impl PartialsStep {
    /// Expand all partial blocks in `html`, resolving paths against `dir`
    pub fn expand(&self, html: &str, dir: &Path) -> AssetflowResult<String> {
        let mut stack = Vec::new();
        self.expand_inner(html, dir, &mut stack)
    }

    fn expand_inner(
        &self,
        html: &str,
        dir: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> AssetflowResult<String> {
        let re = partial_block();
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for caps in re.captures_iter(html) {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&html[last..whole.start()]);
            last = whole.end();

            let path = dir.join(reference.as_str());
            if stack.contains(&path) || stack.len() >= MAX_PARTIAL_DEPTH {
                let mut chain: Vec<String> =
                    stack.iter().map(|p| p.display().to_string()).collect();
                chain.push(path.display().to_string());
                return Err(AssetflowError::TransformFailed {
                    path,
                    message: format!("partial include cycle: {}", chain.join(" → ")),
                });
            }

            let content =
                std::fs::read_to_string(&path).map_err(|e| AssetflowError::read(&path, e))?;
            let partial_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

            stack.push(path);
            let expanded = self.expand_inner(&content, &partial_dir, stack)?;
            stack.pop();

            if self.remove_tags {
                out.push_str(&expanded);
            } else {
                out.push_str(&format!(
                    "<!-- partial:{} -->\n{}\n<!-- partial -->",
                    reference.as_str(),
                    expanded.trim_end_matches('\n')
                ));
            }
        }

        out.push_str(&html[last..]);
        Ok(out)
    }
}

#[async_trait]
impl Step for PartialsStep {
    fn name(&self) -> &'static str {
        "partials"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in &mut assets {
            let source = asset.source_path();
            let dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
            let expanded = self.expand(&asset.text(), &dir)?;
            asset.contents = expanded.into_bytes();
        }
        Ok(assets)
    }
}

/// Normalizes whitespace in HTML output
///
/// Line endings become `\n`, trailing whitespace is trimmed, runs of blank
/// lines are capped and leading/trailing blank lines removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidyStep {
    #[serde(default = "default_max_preserve_newlines")]
    pub max_preserve_newlines: usize,
    #[serde(default)]
    pub end_with_newline: bool,
}

impl Default for TidyStep {
    fn default() -> Self {
        Self {
            max_preserve_newlines: default_max_preserve_newlines(),
            end_with_newline: false,
        }
    }
}

fn default_max_preserve_newlines() -> usize {
    10
}

impl TidyStep {
    pub fn tidy(&self, input: &str) -> String {
        let normalized = input.replace("\r\n", "\n");
        let mut lines: Vec<&str> = Vec::new();
        let mut blank_run = 0;

        for line in normalized.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if lines.is_empty() || blank_run > self.max_preserve_newlines {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            lines.push(line);
        }

        while lines.last() == Some(&"") {
            lines.pop();
        }

        let mut out = lines.join("\n");
        if self.end_with_newline {
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl Step for TidyStep {
    fn name(&self) -> &'static str {
        "tidy"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in &mut assets {
            asset.contents = self.tidy(&asset.text()).into_bytes();
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_expand_with_removed_tags() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "partials/header.html", "<header>Hi</header>");

        let step = PartialsStep { remove_tags: true };
        let html = "<body>\n<!-- partial:partials/header.html -->\nold\n<!-- partial -->\n</body>";
        let out = step.expand(html, dir.path()).unwrap();

        assert_eq!(out, "<body>\n<header>Hi</header>\n</body>");
    }

    #[test]
    fn test_expand_keeps_tags() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "p.html", "<p>x</p>\n");

        let step = PartialsStep { remove_tags: false };
        let out = step
            .expand("<!-- partial:p.html --><!-- partial -->", dir.path())
            .unwrap();

        assert_eq!(out, "<!-- partial:p.html -->\n<p>x</p>\n<!-- partial -->");
    }

    #[test]
    fn test_nested_partials_resolve_relative_to_partial() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "partials/layout.html",
            "<main><!-- partial:inner/nav.html --><!-- partial --></main>",
        );
        write(dir.path(), "partials/inner/nav.html", "<nav/>");

        let step = PartialsStep { remove_tags: true };
        let out = step
            .expand("<!-- partial:partials/layout.html --><!-- partial -->", dir.path())
            .unwrap();

        assert_eq!(out, "<main><nav/></main>");
    }

    #[test]
    fn test_partial_cycle_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.html", "<!-- partial:b.html --><!-- partial -->");
        write(dir.path(), "b.html", "<!-- partial:a.html --><!-- partial -->");

        let step = PartialsStep { remove_tags: true };
        let err = step
            .expand("<!-- partial:a.html --><!-- partial -->", dir.path())
            .unwrap_err();

        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_missing_partial_is_an_error() {
        let dir = TempDir::new().unwrap();
        let step = PartialsStep { remove_tags: true };
        assert!(step
            .expand("<!-- partial:nope.html --><!-- partial -->", dir.path())
            .is_err());
    }

    #[test]
    fn test_tidy() {
        let step = TidyStep {
            max_preserve_newlines: 1,
            end_with_newline: false,
        };
        let out = step.tidy("\n\n<html>  \r\n\n\n\n<body></body>\t\n</html>\n\n");
        assert_eq!(out, "<html>\n\n<body></body>\n</html>");

        let with_newline = TidyStep {
            end_with_newline: true,
            ..Default::default()
        };
        assert_eq!(with_newline.tidy("<p></p>"), "<p></p>\n");
    }
}
