//! Collage rendering. Everything except lossy WebP encoding is pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Fit cover** | `imageops::resize` (Lanczos3) + centre crop |
//! | **Label band** | `imageproc::drawing::draw_filled_rect_mut` |
//! | **Label text** | `ab_glyph` + `imageproc::drawing::draw_text_mut` |
//! | **Composite** | `imageops::overlay` (alpha) then `imageops::replace` |
//! | **Encode** | AVIF (rav1e) / JPEG / WebP (libwebp) with quality, PNG lossless |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for grid and band geometry (unit testable)
//! - **Parameters**: Quality and label style
//! - **Backend**: [`LabelRenderer`] trait + [`FontRenderer`], image codecs
//! - **Operations**: Overlay, composition and the mock collage

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ImagingError, LabelRenderer};
pub use calculations::{CANVAS_EDGE, CELL_EDGE, GRID_CELLS, cell_origin};
pub use operations::{Collage, compose_collage, overlay, test_collage};
pub use params::{LabelStyle, Quality};
pub use rust_backend::{FONT_ENV_VAR, FontRenderer, load_image, save_image};
