//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. Stock defaults are
//! overridden by whatever the user file specifies, so a project only needs to
//! list the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! author = "maror"
//! sitename = "maror"
//! site_url = ""
//! theme = "notmyidea"
//! content_path = "content"
//! output_path = "output"
//! timezone = "Asia/Jerusalem"
//! default_lang = "en"
//! static_paths = ["static"]
//! default_pagination = false
//! links = [["Pelican", "https://getpelican.com/"]]
//! social = []
//!
//! [build]
//! force_rerender = false    # Regenerate artifacts even if they exist
//! mock = false              # Offline collage from a static image
//!
//! [collage]
//! username = "jpegaga"      # Last.fm user whose top albums are drawn
//! period = "1month"         # overall | 7day | 1month | 3month | 6month | 12month
//! fetch_limit = 15          # Albums requested (extra to cover missing art)
//! output = "content/static/collage.avif"
//! quality = 40              # Lossy encoding quality (1-100)
//! font = "fonts/label.ttf"  # Overrides COLLAGE_TTF when set
//! mock_art = "content/static/me.webp"
//!
//! [cv]
//! source = "content/cv/cv.org"
//! output_dir = "content/static/cv"
//! styles_dir = "pandoc_cv/styles"
//! style = "chmduquesne"
//! tmp_dir = "/tmp/pandoc-resume"
//! ```
//!
//! Secrets (`LASTFM_API_KEY`, `LASTFM_API_SECRET`) never live in this file;
//! they come from the environment or a `.env` file.
//!
//! Unknown keys are rejected to catch typos early.

use crate::lastfm::Period;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the project config, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `site.toml`.
///
/// The top-level keys describe the site itself and are kept for the static
/// site generator that consumes the build artifacts. The `build`, `collage`
/// and `cv` tables drive this tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub author: String,
    pub sitename: String,
    pub site_url: String,
    pub theme: String,
    /// Content directory the site generator reads from.
    pub content_path: PathBuf,
    /// Directory the site generator renders into.
    pub output_path: PathBuf,
    pub timezone: String,
    pub default_lang: String,
    /// Directories under `content_path` copied verbatim.
    pub static_paths: Vec<String>,
    pub default_pagination: bool,
    /// Blogroll entries as `[label, url]` pairs.
    pub links: Vec<(String, String)>,
    /// Social widget entries as `[label, url]` pairs.
    pub social: Vec<(String, String)>,
    /// Build-time flags shared by every step.
    pub build: BuildFlags,
    /// Last.fm collage settings.
    pub collage: CollageConfig,
    /// CV conversion settings.
    pub cv: CvConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            author: "maror".to_string(),
            sitename: "maror".to_string(),
            site_url: String::new(),
            theme: "notmyidea".to_string(),
            content_path: PathBuf::from("content"),
            output_path: PathBuf::from("output"),
            timezone: "Asia/Jerusalem".to_string(),
            default_lang: "en".to_string(),
            static_paths: vec!["static".to_string()],
            default_pagination: false,
            links: vec![
                ("Pelican".to_string(), "https://getpelican.com/".to_string()),
                ("Python.org".to_string(), "https://www.python.org/".to_string()),
                (
                    "Jinja2".to_string(),
                    "https://palletsprojects.com/p/jinja/".to_string(),
                ),
            ],
            social: Vec::new(),
            build: BuildFlags::default(),
            collage: CollageConfig::default(),
            cv: CvConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collage.quality == 0 || self.collage.quality > 100 {
            return Err(ConfigError::Validation(
                "collage.quality must be 1-100".into(),
            ));
        }
        if self.collage.fetch_limit == 0 {
            return Err(ConfigError::Validation(
                "collage.fetch_limit must be non-zero".into(),
            ));
        }
        if self.collage.username.trim().is_empty() {
            return Err(ConfigError::Validation(
                "collage.username must not be empty".into(),
            ));
        }
        if self.cv.style.trim().is_empty() {
            return Err(ConfigError::Validation("cv.style must not be empty".into()));
        }
        Ok(())
    }
}

/// Flags read by every build step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildFlags {
    /// Regenerate artifacts even when the outputs already exist.
    pub force_rerender: bool,
    /// Build the collage from `collage.mock_art` instead of calling Last.fm.
    pub mock: bool,
}

/// Last.fm collage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollageConfig {
    /// Last.fm user whose top albums are drawn.
    pub username: String,
    /// Ranking window.
    pub period: Period,
    /// How many albums to request. More than nine so entries without art can
    /// be dropped and the next album drawn instead.
    pub fetch_limit: u32,
    /// Where the collage is written.
    pub output: PathBuf,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// TTF/OTF used for the labels. Falls back to `COLLAGE_TTF` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    /// Static cover repeated in every cell of the mock collage.
    pub mock_art: PathBuf,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            username: "jpegaga".to_string(),
            period: Period::OneMonth,
            fetch_limit: 15,
            output: PathBuf::from("content/static/collage.avif"),
            quality: 40,
            font: None,
            mock_art: PathBuf::from("content/static/me.webp"),
        }
    }
}

/// CV conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CvConfig {
    /// Org-mode source of the CV. Its file stem names every output.
    pub source: PathBuf,
    /// Directory receiving `<stem>.pdf`, `<stem>.html`, `<stem>.docx`.
    pub output_dir: PathBuf,
    /// Directory holding the `<style>.tex`, `<style>.css` and Lua filter.
    pub styles_dir: PathBuf,
    /// Base name of the ConTeXt template and stylesheet.
    pub style: String,
    /// Scratch directory for the intermediate ConTeXt run.
    pub tmp_dir: PathBuf,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("content/cv/cv.org"),
            output_dir: PathBuf::from("content/static/cv"),
            styles_dir: PathBuf::from("pandoc_cv/styles"),
            style: "chmduquesne".to_string(),
            tmp_dir: PathBuf::from("/tmp/pandoc-resume"),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given `site.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `site.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# homesite configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Last.fm credentials are read from the environment (or a .env file):
#   LASTFM_API_KEY, LASTFM_API_SECRET
# The label font may also come from COLLAGE_TTF.

author = "maror"
sitename = "maror"
site_url = ""
theme = "notmyidea"

# Content directory the site generator reads, and where it renders to.
content_path = "content"
output_path = "output"

timezone = "Asia/Jerusalem"
default_lang = "en"

# Directories under content_path copied verbatim into the output.
static_paths = ["static"]

default_pagination = false

# Blogroll and social widget, as [label, url] pairs.
links = [
    ["Pelican", "https://getpelican.com/"],
    ["Python.org", "https://www.python.org/"],
    ["Jinja2", "https://palletsprojects.com/p/jinja/"],
]
social = []

# ---------------------------------------------------------------------------
# Build flags
# ---------------------------------------------------------------------------
[build]
# Regenerate the collage and CV even when the outputs already exist.
force_rerender = false

# Draw the collage from a static image with random labels instead of
# calling Last.fm. Useful offline.
mock = false

# ---------------------------------------------------------------------------
# Last.fm collage
# ---------------------------------------------------------------------------
[collage]
username = "jpegaga"

# Ranking window: overall, 7day, 1month, 3month, 6month, 12month.
period = "1month"

# Albums requested. Only nine are drawn; the rest replace entries
# that have no cover art.
fetch_limit = 15

# Output path. The extension picks the encoder (avif, jpg, png, webp).
output = "content/static/collage.avif"

# Lossy encoding quality (1 = worst, 100 = best). Ignored by png.
quality = 40

# Label font. Falls back to COLLAGE_TTF when omitted.
# font = "fonts/label.ttf"

# Image repeated in every cell when mock = true.
mock_art = "content/static/me.webp"

# ---------------------------------------------------------------------------
# CV
# ---------------------------------------------------------------------------
[cv]
# Org-mode source. Its file stem names the outputs (cv.pdf, cv.html, cv.docx).
source = "content/cv/cv.org"
output_dir = "content/static/cv"

# Must contain <style>.tex, <style>.css and pdc-links-target-blank.lua.
styles_dir = "pandoc_cv/styles"
style = "chmduquesne"

# Scratch directory for the ConTeXt run.
tmp_dir = "/tmp/pandoc-resume"
"##
}
