// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Image steps
//!
//! Decoding and encoding are delegated to the `image` crate and run on the
//! blocking thread pool.

use async_trait::async_trait;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::svg::minify_svg;
use super::{Asset, Step, StepContext, TaskReport};
use crate::errors::{AssetflowError, AssetflowResult};

/// PNG encoder effort
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(level: PngCompression) -> Self {
        match level {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// Recompresses images
///
/// PNGs are re-encoded and the smaller of the two encodings is kept. SVGs are
/// minified. Other formats pass through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeImagesStep {
    #[serde(default)]
    pub png_compression: PngCompression,
}

fn decode(path: &Path, bytes: &[u8]) -> AssetflowResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| AssetflowError::TransformFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn encode_failed(path: &Path, e: image::ImageError) -> AssetflowError {
    AssetflowError::TransformFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Re-encode a PNG, returning the smaller of the original and the new encoding
pub fn recompress_png(
    path: &Path,
    bytes: Vec<u8>,
    level: PngCompression,
) -> AssetflowResult<Vec<u8>> {
    let img = decode(path, &bytes)?;

    let mut encoded = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut encoded, level.into(), FilterType::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| encode_failed(path, e))?;

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes)
    }
}

/// Encode a raster image as lossless WebP
pub fn encode_webp(path: &Path, bytes: &[u8]) -> AssetflowResult<Vec<u8>> {
    let img = decode(path, bytes)?;
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());

    let mut encoded = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut encoded))
        .map_err(|e| encode_failed(path, e))?;
    Ok(encoded)
}

async fn blocking<T, F>(f: F) -> AssetflowResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AssetflowResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AssetflowError::Io {
            message: format!("image worker failed: {}", e),
        })?
}

#[async_trait]
impl Step for OptimizeImagesStep {
    fn name(&self) -> &'static str {
        "optimize_images"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in &mut assets {
            if asset.has_extension(&["png"]) {
                let path = asset.source_path();
                let bytes = std::mem::take(&mut asset.contents);
                let level = self.png_compression;
                asset.contents = blocking(move || recompress_png(&path, bytes, level)).await?;
            } else if asset.has_extension(&["svg"]) {
                asset.contents = minify_svg(&asset.text()).into_bytes();
            }
        }
        Ok(assets)
    }
}

/// Converts PNG and JPEG images to WebP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebpStep {}

#[async_trait]
impl Step for WebpStep {
    fn name(&self) -> &'static str {
        "webp"
    }

    async fn apply(
        &self,
        mut assets: Vec<Asset>,
        _ctx: &StepContext<'_>,
        _report: &mut TaskReport,
    ) -> AssetflowResult<Vec<Asset>> {
        for asset in &mut assets {
            if !asset.has_extension(&["png", "jpg", "jpeg"]) {
                tracing::debug!(file = %asset.relative.display(), "not a raster image, passing through");
                continue;
            }

            let path = asset.source_path();
            let bytes = std::mem::take(&mut asset.contents);
            asset.contents = blocking(move || encode_webp(&path, &bytes)).await?;
            asset.relative.set_extension("webp");
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_recompress_never_grows() {
        let png = sample_png();
        let out = recompress_png(Path::new("a.png"), png.clone(), PngCompression::Best).unwrap();
        assert!(out.len() <= png.len());

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_encode_webp() {
        let webp = encode_webp(Path::new("a.png"), &sample_png()).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = encode_webp(Path::new("broken.png"), b"not an image").unwrap_err();
        assert!(matches!(err, AssetflowError::TransformFailed { .. }));
    }
}
