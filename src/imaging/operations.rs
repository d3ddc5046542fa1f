//! High-level collage operations.
//!
//! These functions combine the grid calculations with a [`LabelRenderer`].
//! They never touch the network or the filesystem; callers hand in decoded
//! albums and get back an image.

use super::backend::LabelRenderer;
use super::calculations::{
    CANVAS_EDGE, CELL_EDGE, GRID_CELLS, band_height, calculate_fill_dimensions,
    center_crop_offset, cell_origin,
};
use super::params::LabelStyle;
use crate::types::{Album, Placement};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbImage, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::Rng;

/// Characters the mock labels are drawn from.
const MOCK_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz ";

/// A finished collage and where each album went.
#[derive(Debug, Clone)]
pub struct Collage {
    /// Opaque 900×900 image.
    pub image: RgbImage,
    /// One entry per drawn album, in fetch order.
    pub placements: Vec<Placement>,
}

impl Collage {
    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image)
    }
}

/// Label text for an album: title above artist.
pub fn album_label(album: &Album) -> String {
    format!("{}\n{}", album.title, album.artist)
}

/// A cell-sized transparent layer with a translucent band across the top
/// and `text` drawn on it.
///
/// The band is as tall as the measured text plus a little padding.
pub fn overlay(renderer: &impl LabelRenderer, style: &LabelStyle, text: &str) -> RgbaImage {
    let mut layer = RgbaImage::from_pixel(CELL_EDGE, CELL_EDGE, Rgba([255, 255, 255, 0]));
    let height = band_height(renderer.text_height(text));
    draw_filled_rect_mut(
        &mut layer,
        Rect::at(0, 0).of_size(CELL_EDGE, height),
        style.band_color,
    );
    renderer.draw_text(&mut layer, text);
    layer
}

/// Bring a cover to exactly one cell: fill-resize, then centre-crop.
///
/// Covers already at cell size are returned untouched.
pub fn fit_cover(cover: RgbaImage) -> RgbaImage {
    let target = (CELL_EDGE, CELL_EDGE);
    let dims = cover.dimensions();
    if dims == target {
        return cover;
    }
    if dims.0 == 0 || dims.1 == 0 {
        return RgbaImage::new(CELL_EDGE, CELL_EDGE);
    }
    let (w, h) = calculate_fill_dimensions(dims, target);
    let filled = imageops::resize(&cover, w, h, FilterType::Lanczos3);
    let (x, y) = center_crop_offset((w, h), target);
    imageops::crop_imm(&filled, x, y, CELL_EDGE, CELL_EDGE).to_image()
}

/// Composite up to nine albums into a 3×3 grid.
///
/// Albums fill cells left-to-right, top-to-bottom, in the order given;
/// anything past the ninth is ignored. Each cover gets its label overlay
/// alpha-composited on top before being pasted into place. Cells without an
/// album stay transparent and come out black once the canvas is flattened.
pub fn compose_collage<I>(albums: I, renderer: &impl LabelRenderer) -> Collage
where
    I: IntoIterator<Item = Album>,
{
    let style = LabelStyle::default();
    let mut canvas = RgbaImage::new(CANVAS_EDGE, CANVAS_EDGE);
    let mut placements = Vec::with_capacity(GRID_CELLS);

    for (index, album) in albums.into_iter().take(GRID_CELLS).enumerate() {
        let Some((x, y)) = cell_origin(index) else {
            break;
        };
        let label = album_label(&album);
        let mut cell = fit_cover(album.cover_art);
        imageops::overlay(&mut cell, &overlay(renderer, &style, &label), 0, 0);
        imageops::replace(&mut canvas, &cell, x as i64, y as i64);

        log::debug!("placed \"{}\" by {} at ({x}, {y})", album.title, album.artist);
        placements.push(Placement {
            x,
            y,
            title: album.title,
            artist: album.artist,
        });
    }

    // Dropping alpha flattens transparent cells to black.
    let image = DynamicImage::ImageRgba8(canvas).to_rgb8();
    Collage { image, placements }
}

/// A random label for the mock collage: 5–50 lowercase letters and spaces,
/// trimmed.
pub fn random_label(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(5..=50);
    let raw: String = (0..len)
        .map(|_| MOCK_ALPHABET[rng.gen_range(0..MOCK_ALPHABET.len())] as char)
        .collect();
    raw.trim().to_string()
}

/// Offline stand-in for the live collage: the same art in all nine cells
/// with random titles and artists.
///
/// Only meant for previewing the layout; the output is not a reference image.
pub fn test_collage(
    art: &RgbaImage,
    renderer: &impl LabelRenderer,
    rng: &mut impl Rng,
) -> Collage {
    let albums: Vec<Album> = (0..GRID_CELLS)
        .map(|_| Album {
            title: random_label(rng),
            artist: random_label(rng),
            cover_art: art.clone(),
        })
        .collect();
    compose_collage(albums, renderer)
}
