//! Pure calculation functions for collage geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Edge length of one square collage cell, in pixels. Matches Last.fm's
/// "extralarge" cover size.
pub const CELL_EDGE: u32 = 300;

/// Cells per row and per column.
pub const GRID_SIZE: u32 = 3;

/// Number of albums a collage can hold.
pub const GRID_CELLS: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// Edge length of the whole collage.
pub const CANVAS_EDGE: u32 = CELL_EDGE * GRID_SIZE;

/// Vertical padding added below the label text inside its band.
pub const BAND_BOTTOM_PADDING: u32 = 5;

/// Top-left pixel of the cell holding the album at `index` (fetch order).
///
/// Cells fill left-to-right, then top-to-bottom. Returns `None` once the
/// grid is full.
///
/// # Examples
/// ```
/// # use homesite::imaging::cell_origin;
/// assert_eq!(cell_origin(0), Some((0, 0)));
/// assert_eq!(cell_origin(1), Some((300, 0)));
/// assert_eq!(cell_origin(3), Some((0, 300)));
/// assert_eq!(cell_origin(8), Some((600, 600)));
/// assert_eq!(cell_origin(9), None);
/// ```
pub fn cell_origin(index: usize) -> Option<(u32, u32)> {
    if index >= GRID_CELLS {
        return None;
    }
    let row = index as u32 / GRID_SIZE;
    let col = index as u32 % GRID_SIZE;
    Some((col * CELL_EDGE, row * CELL_EDGE))
}

/// Height of the translucent band behind a label whose text measures
/// `text_height` pixels. Never taller than a cell.
pub fn band_height(text_height: u32) -> u32 {
    (text_height + BAND_BOTTOM_PADDING).min(CELL_EDGE)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Offset of a centred `target` window inside `filled`.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}
