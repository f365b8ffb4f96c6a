// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! SVG steps: cleanup and sprite assembly

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{Asset, Step, StepContext, TaskReport};
use crate::errors::{AssetflowError, AssetflowResult};

struct SvgPatterns {
    declaration: Regex,
    doctype: Regex,
    comment: Regex,
    metadata: Regex,
    between_tags: Regex,
    root: Regex,
    view_box: Regex,
}

fn patterns() -> &'static SvgPatterns {
    static PATTERNS: OnceLock<SvgPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SvgPatterns {
        declaration: Regex::new(r"(?s)<\?xml.*?\?>").expect("valid pattern"),
        doctype: Regex::new(r"(?s)<!DOCTYPE[^>]*>").expect("valid pattern"),
        comment: Regex::new(r"(?s)<!--.*?-->").expect("valid pattern"),
        metadata: Regex::new(r"(?s)<metadata\b.*?</metadata>").expect("valid pattern"),
        between_tags: Regex::new(r">\s+<").expect("valid pattern"),
        root: Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg>").expect("valid pattern"),
        view_box: Regex::new(r#"viewBox\s*=\s*["']([^"']*)["']"#).expect("valid pattern"),
    })
}

/// Strip declarations, doctypes, comments, metadata and inter-tag whitespace
pub fn minify_svg(svg: &str) -> String {
    let p = patterns();
    let out = p.declaration.replace_all(svg, "");
    let out = p.doctype.replace_all(&out, "");
    let out = p.comment.replace_all(&out, "");
    let out = p.metadata.replace_all(&out, "");
    let out = p.between_tags.replace_all(&out, "><");
    out.trim().to_string()
}

/// Minifies SVG assets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SvgMinStep {}

#[async_trait]
impl Step for SvgMinStep {
    fn name(&self) -> &'static str {
        "svgmin"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in assets.iter_mut().filter(|a| a.has_extension(&["svg"])) {
            asset.contents = minify_svg(&asset.text()).into_bytes();
        }
        Ok(assets)
    }
}

/// Merges SVG assets into one sprite of `<symbol>` elements
///
/// Each symbol's id is the file stem; ids must be unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvgStoreStep {
    #[serde(default = "default_sprite_name")]
    pub filename: String,
}

impl Default for SvgStoreStep {
    fn default() -> Self {
        Self {
            filename: default_sprite_name(),
        }
    }
}

fn default_sprite_name() -> String {
    "sprite.svg".to_string()
}

impl SvgStoreStep {
    /// Build the sprite document from `assets`
    pub fn combine(&self, assets: &[Asset]) -> AssetflowResult<String> {
        let p = patterns();
        let mut seen = HashSet::new();
        let mut sprite = String::from(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
        );

        for asset in assets {
            let id = asset.stem();
            if !seen.insert(id.clone()) {
                return Err(AssetflowError::TransformFailed {
                    path: asset.source_path(),
                    message: format!("duplicate symbol id '{}'", id),
                });
            }

            let text = asset.text();
            let caps = p
                .root
                .captures(&text)
                .ok_or_else(|| AssetflowError::TransformFailed {
                    path: asset.source_path(),
                    message: "no <svg> root element".to_string(),
                })?;
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");

            sprite.push_str(&format!("<symbol id=\"{}\"", id));
            if let Some(view_box) = p.view_box.captures(attrs).and_then(|c| c.get(1)) {
                sprite.push_str(&format!(" viewBox=\"{}\"", view_box.as_str()));
            }
            sprite.push('>');
            sprite.push_str(body.trim());
            sprite.push_str("</symbol>");
        }

        sprite.push_str("</svg>");
        Ok(sprite)
    }
}

#[async_trait]
impl Step for SvgStoreStep {
    fn name(&self) -> &'static str {
        "svgstore"
    }

    async fn apply(
        &self,
        assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        let (svgs, mut rest): (Vec<Asset>, Vec<Asset>) =
            assets.into_iter().partition(|a| a.has_extension(&["svg"]));

        let Some(first) = svgs.first() else {
            return Ok(rest);
        };

        let sprite = self.combine(&svgs)?;
        let base = first.base.clone();
        rest.push(Asset::new(base, self.filename.as_str(), sprite.into_bytes()));
        Ok(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Generator: Sketch -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24">
    <metadata>junk</metadata>
    <path d="M0 0h24v24H0z"/>
</svg>
"#;

    #[test]
    fn test_minify_svg() {
        let out = minify_svg(ICON);
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24"><path d="M0 0h24v24H0z"/></svg>"#
        );
    }

    #[test]
    fn test_combine_symbols() {
        let step = SvgStoreStep::default();
        let assets = vec![
            Asset::new("/icons", "icon-mail.svg", minify_svg(ICON).into_bytes()),
            Asset::new("/icons", "icon-user.svg", b"<svg><circle r=\"1\"/></svg>".to_vec()),
        ];

        let sprite = step.combine(&assets).unwrap();
        assert!(sprite.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(sprite.contains(
            "<symbol id=\"icon-mail\" viewBox=\"0 0 24 24\"><path d=\"M0 0h24v24H0z\"/></symbol>"
        ));
        assert!(sprite.contains("<symbol id=\"icon-user\"><circle r=\"1\"/></symbol>"));
        assert!(sprite.ends_with("</svg>"));
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let step = SvgStoreStep::default();
        let assets = vec![
            Asset::new("/a", "x.svg", b"<svg></svg>".to_vec()),
            Asset::new("/b", "x.svg", b"<svg></svg>".to_vec()),
        ];
        assert!(step.combine(&assets).is_err());
    }

    #[test]
    fn test_not_an_svg_fails() {
        let step = SvgStoreStep::default();
        let assets = vec![Asset::new("/a", "x.svg", b"hello".to_vec())];
        assert!(step.combine(&assets).is_err());
    }
}
