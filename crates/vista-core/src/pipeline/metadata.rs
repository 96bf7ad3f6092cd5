//! Basic image properties stored alongside each vector.

use image::{ColorType, DynamicImage};
use serde::Serialize;
use std::path::Path;

use super::decode::{format_to_string, DecodedImage};
use crate::types::ImageMetadata;

/// Builds [`ImageMetadata`] and the more detailed [`ImageStats`].
pub struct MetadataExtractor;

/// Detailed statistics for a single image, printed by `vista inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageStats {
    pub filename: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Colour layout, e.g. "RGB8" or "RGBA8"
    pub mode: String,
    pub size_kb: f64,
    /// width / height, 0 when the height is 0
    pub aspect_ratio: f64,
}

impl MetadataExtractor {
    /// Metadata for an image that has already been decoded.
    pub fn from_decoded(decoded: &DecodedImage) -> ImageMetadata {
        ImageMetadata {
            width: decoded.width,
            height: decoded.height,
            format: format_to_string(decoded.format),
            size_kb: decoded.file_size as f64 / 1024.0,
        }
    }

    /// Full statistics for an already-decoded image at `path`.
    pub fn stats(path: &Path, decoded: &DecodedImage) -> ImageStats {
        let metadata = Self::from_decoded(decoded);
        ImageStats {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.display().to_string(),
            width: metadata.width,
            height: metadata.height,
            format: metadata.format,
            mode: color_mode(&decoded.image).to_string(),
            size_kb: metadata.size_kb,
            aspect_ratio: aspect_ratio(metadata.width, metadata.height),
        }
    }
}

fn aspect_ratio(width: u32, height: u32) -> f64 {
    if height > 0 {
        width as f64 / height as f64
    } else {
        0.0
    }
}

fn color_mode(image: &DynamicImage) -> &'static str {
    match image.color() {
        ColorType::L8 => "L8",
        ColorType::La8 => "LA8",
        ColorType::Rgb8 => "RGB8",
        ColorType::Rgba8 => "RGBA8",
        ColorType::L16 => "L16",
        ColorType::La16 => "LA16",
        ColorType::Rgb16 => "RGB16",
        ColorType::Rgba16 => "RGBA16",
        ColorType::Rgb32F => "RGB32F",
        ColorType::Rgba32F => "RGBA32F",
        _ => "unknown",
    }
}
