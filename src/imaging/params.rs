//! Parameter types for collage rendering.
//!
//! These structs describe *what* to draw, not *how*. They sit between the
//! [`operations`](super::operations) module (which decides what goes where)
//! and the [`backend`](super::backend) (which does the glyph work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 40). Clamped on construction.
//! - [`LabelStyle`]: Font size and colours of the label band drawn over each cover.

use image::Rgba;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(40)
    }
}

/// Look of the label band drawn across the top of each cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Glyph height in pixels.
    pub font_size: f32,
    /// Band fill; the alpha channel sets how much cover shows through.
    pub band_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 15.0,
            band_color: Rgba([0, 0, 0, 180]),
            text_color: Rgba([255, 255, 255, 255]),
        }
    }
}
