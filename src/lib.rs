//! # homesite
//!
//! Build tooling for a personal website. Two artifacts are produced next to
//! the static-site content:
//!
//! - a **Last.fm collage**: the owner's top albums of the past month as a
//!   3×3 grid of labelled covers, and
//! - a **CV** in PDF, HTML and DOCX, converted from one org-mode source.
//!
//! # Architecture
//!
//! ```text
//! site.toml ─► BuildContext ─► CollageStep ─► lastfm ─► imaging ─► collage.avif
//!                          └─► CvStep ─► cv ─► pandoc / mtxrun ─► cv.{pdf,html,docx}
//! ```
//!
//! The build is a plain ordered list of [`pipeline::BuildStep`]s, each handed
//! an explicit [`pipeline::BuildContext`]. There is no global settings object
//! and no hook registration; what runs, and in which order, is visible in
//! [`pipeline::default_steps`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`lastfm`] | `user.getTopAlbums` client and the lazy album filter |
//! | [`imaging`] | Grid geometry, label overlays, composition, encoding |
//! | [`cv`] | pandoc/ConTeXt conversion behind a command-runner seam |
//! | [`pipeline`] | Build context, steps, and the step driver |
//! | [`config`] | `site.toml` loading, stock defaults, validation |
//! | [`types`] | Data shared between fetcher, composer and output |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Seams at the Edges
//!
//! Each module that reaches outside the process does it through one trait:
//! [`lastfm::ScrobbleService`] for HTTP, [`imaging::LabelRenderer`] for font
//! rasterization, [`cv::CommandRunner`] for subprocesses. Everything between
//! those traits is deterministic, and the test suite runs without network,
//! fonts or pandoc.
//!
//! ## Lazy Cover Downloads
//!
//! More albums are requested than the grid holds, because some entries come
//! back without artwork. Filtering happens on metadata first and covers are
//! downloaded as the iterator is consumed, so only the nine albums that end
//! up in the collage cost a download.
//!
//! ## Imaging Without System Libraries
//!
//! Decoding, text rendering and AVIF encoding are pure Rust (`image`,
//! `imageproc`, `ab_glyph`, `rav1e`). Lossy WebP goes through libwebp, which
//! the `webp` crate compiles in, since `image` only writes lossless WebP.
//! The only external programs are the document converters, which have no
//! Rust equivalent.

pub mod config;
pub mod cv;
pub mod imaging;
pub mod lastfm;
pub mod output;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
