//! Shared types passed between the fetcher, the composer and the CLI output.

use image::RgbaImage;

/// An album ready to be drawn: metadata plus decoded cover art.
///
/// Only constructed by the fetcher once all three fields are known, so a
/// cover is never missing.
#[derive(Debug, Clone)]
pub struct Album {
    pub title: String,
    pub artist: String,
    pub cover_art: RgbaImage,
}

/// A ranked entry as reported by the scrobbling service, before filtering.
///
/// Every field the service may omit is optional; the fetcher decides what
/// is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopAlbum {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub playcount: u64,
    pub rank: u32,
    /// Largest non-empty cover URL the service listed.
    pub cover_url: Option<String>,
}

/// Where one album landed in the collage grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub title: String,
    pub artist: String,
}
