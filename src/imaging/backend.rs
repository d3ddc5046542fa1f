//! Text rendering backend trait and shared error type.
//!
//! The [`LabelRenderer`] trait covers the two things the composer needs from
//! a font: how tall a label is, and drawing it. The production
//! implementation is [`FontRenderer`](super::rust_backend::FontRenderer),
//! which rasterizes a TrueType/OpenType file. Tests use a mock that measures
//! by line count, so no font file is needed to exercise grid placement.

use image::RgbaImage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Encoding failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("No label font configured (set COLLAGE_TTF or collage.font)")]
    MissingFont,
    #[error("Invalid font file {0}")]
    InvalidFont(PathBuf),
}

/// Renders label text onto an RGBA layer.
pub trait LabelRenderer {
    /// Height in pixels of `text` as drawn, including every line.
    fn text_height(&self, text: &str) -> u32;

    /// Draw `text` with its top-left corner at the origin of `canvas`.
    /// Lines are separated by `\n`.
    fn draw_text(&self, canvas: &mut RgbaImage, text: &str);
}
