//! Pure Rust rendering backend: glyph rasterization, decoding, encoding.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Font parsing + metrics | `ab_glyph::FontVec`, `ScaleFont` |
//! | Text drawing | `imageproc::drawing::draw_text_mut` |
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy) |
//! | Encode → PNG | `image` crate, lossless |

use super::backend::{ImagingError, LabelRenderer};
use super::params::{LabelStyle, Quality};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::path::{Path, PathBuf};

/// Environment variable naming the label font.
pub const FONT_ENV_VAR: &str = "COLLAGE_TTF";

/// Extra pixels between consecutive label lines.
const LINE_SPACING: f32 = 4.0;

/// [`LabelRenderer`] backed by a TrueType/OpenType font file.
pub struct FontRenderer {
    font: FontVec,
    style: LabelStyle,
}

impl FontRenderer {
    /// Load a font file and render with `style`.
    pub fn from_file(path: &Path, style: LabelStyle) -> Result<Self, ImagingError> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| ImagingError::InvalidFont(path.to_path_buf()))?;
        Ok(Self { font, style })
    }

    /// Load the configured font, falling back to `COLLAGE_TTF`.
    pub fn from_config(configured: Option<&Path>) -> Result<Self, ImagingError> {
        let from_env = std::env::var_os(FONT_ENV_VAR).map(PathBuf::from);
        let path = resolve_font_path(configured, from_env)?;
        Self::from_file(&path, LabelStyle::default())
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.style.font_size)
    }

    fn line_height(&self) -> f32 {
        let scaled = self.font.as_scaled(self.scale());
        scaled.ascent() - scaled.descent()
    }
}

impl LabelRenderer for FontRenderer {
    fn text_height(&self, text: &str) -> u32 {
        let lines = text.lines().count();
        if lines == 0 {
            return 0;
        }
        let height = lines as f32 * self.line_height() + (lines - 1) as f32 * LINE_SPACING;
        height.ceil() as u32
    }

    fn draw_text(&self, canvas: &mut RgbaImage, text: &str) {
        let advance = self.line_height() + LINE_SPACING;
        for (i, line) in text.lines().enumerate() {
            let y = (i as f32 * advance).round() as i32;
            imageproc::drawing::draw_text_mut(
                canvas,
                self.style.text_color,
                0,
                y,
                self.scale(),
                &self.font,
                line,
            );
        }
    }
}

/// Pick the font path: explicit config wins over the environment.
fn resolve_font_path(
    configured: Option<&Path>,
    from_env: Option<PathBuf>,
) -> Result<PathBuf, ImagingError> {
    configured
        .map(Path::to_path_buf)
        .or(from_env)
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ImagingError::MissingFont)
}

/// Load and decode an image from disk as RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, ImagingError> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|source| ImagingError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(img.to_rgba8())
}

/// Save an image to `path`, choosing the encoder from the extension.
///
/// AVIF, JPEG and WebP honour `quality`; PNG is written lossless.
pub fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), ImagingError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match ext.as_str() {
        "avif" => save_avif(img, path, quality),
        "jpg" | "jpeg" => save_jpeg(img, path, quality),
        "png" => img
            .save_with_format(path, ImageFormat::Png)
            .map_err(ImagingError::Encode),
        "webp" => save_webp(img, path, quality),
        other => Err(ImagingError::UnsupportedFormat(other.to_string())),
    }
}

/// Encode and save as AVIF using rav1e (speed=6 for reasonable throughput).
fn save_avif(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), ImagingError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality.value() as u8);
    img.write_with_encoder(encoder)
        .map_err(ImagingError::Encode)
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), ImagingError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality.value() as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(ImagingError::Encode)
}

/// Lossy WebP via libwebp. Alpha is kept when the source has it.
fn save_webp(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), ImagingError> {
    let (width, height) = (img.width(), img.height());
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality.value() as f32)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode(quality.value() as f32)
    };
    std::fs::write(path, &*encoded)?;
    Ok(())
}
