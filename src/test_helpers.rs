//! Shared test utilities for the homesite test suite.
//!
//! Fixture builders for albums and cover art, plus a helper that lays out a
//! throwaway CV project on disk.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::imaging::CELL_EDGE;
use crate::types::Album;
use image::{Rgba, RgbaImage};

// =========================================================================
// Imaging fixtures
// =========================================================================

/// A cell-sized cover filled with one colour.
pub fn solid_cover(color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(CELL_EDGE, CELL_EDGE, Rgba(color))
}

/// An album with a solid-colour cover.
pub fn album(title: &str, artist: &str, color: [u8; 4]) -> Album {
    Album {
        title: title.to_string(),
        artist: artist.to_string(),
        cover_art: solid_cover(color),
    }
}

// =========================================================================
// CV fixtures
// =========================================================================

/// Temp directory holding `cv.org`, a `styles/` dir and an empty `out/` dir.
pub struct CvProject {
    pub dir: TempDir,
    pub input: PathBuf,
    pub styles: PathBuf,
    pub out: PathBuf,
}

pub fn cv_project() -> CvProject {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cv.org");
    std::fs::write(&input, "* Jane Doe\n** Experience\n").unwrap();
    let styles = dir.path().join("styles");
    std::fs::create_dir_all(&styles).unwrap();
    let out = dir.path().join("out");
    CvProject {
        dir,
        input,
        styles,
        out,
    }
}

/// Create empty files named `<title>.<ext>` in `dir`.
pub fn touch_outputs(dir: &Path, title: &str, exts: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for ext in exts {
        std::fs::write(dir.join(format!("{title}.{ext}")), b"").unwrap();
    }
}
