//! Album fetcher backed by the Last.fm web API.
//!
//! This is the only module that talks to the outside world on the collage
//! path; everything downstream of [`fetch_albums`] is a pure transformation.
//!
//! ## Flow
//!
//! ```text
//! user.getTopAlbums (one request, `limit` entries)
//!   → drop entries without cover URL, artist or title
//!   → download + decode each remaining cover, lazily
//!   → Album { title, artist, cover_art }
//! ```
//!
//! More albums are requested than the nine a collage needs so that entries
//! without artwork can be dropped and the next one drawn instead. Covers are
//! only downloaded as the iterator is advanced, so a caller that takes nine
//! never pays for the rest.
//!
//! The [`ScrobbleService`] trait is the seam between the HTTP client and the
//! filtering logic; tests drive the filter through a mock implementation.

use crate::types::{Album, TopAlbum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

pub const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";
pub const API_KEY_VAR: &str = "LASTFM_API_KEY";
pub const API_SECRET_VAR: &str = "LASTFM_API_SECRET";

/// Upper bound on a downloaded cover. Last.fm's largest size is 300×300.
const MAX_COVER_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    #[error("Last.fm error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode cover {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// Ranking window accepted by `user.getTopAlbums`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "overall")]
    Overall,
    #[serde(rename = "7day")]
    SevenDay,
    #[default]
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3month")]
    ThreeMonth,
    #[serde(rename = "6month")]
    SixMonth,
    #[serde(rename = "12month")]
    TwelveMonth,
}

impl Period {
    /// Value of the `period` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Overall => "overall",
            Period::SevenDay => "7day",
            Period::OneMonth => "1month",
            Period::ThreeMonth => "3month",
            Period::SixMonth => "6month",
            Period::TwelveMonth => "12month",
        }
    }
}

/// API credentials. Both values are required even though read-only calls
/// only send the key.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// Blank values count as missing.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FetchError> {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(FetchError::MissingCredential(key))
        };
        Ok(Self {
            api_key: require(API_KEY_VAR)?,
            api_secret: require(API_SECRET_VAR)?,
        })
    }
}

/// Source of ranked albums and their cover art.
pub trait ScrobbleService {
    /// Top albums for `user` over `period`, best first, at most `limit` entries.
    fn top_albums(
        &self,
        user: &str,
        period: Period,
        limit: u32,
    ) -> Result<Vec<TopAlbum>, FetchError>;

    /// Download and decode a cover image.
    fn cover_art(&self, url: &str) -> Result<image::RgbaImage, FetchError>;
}

/// Fetch the user's top albums as a lazy sequence.
///
/// The ranking request happens up front; covers are downloaded one by one as
/// the iterator is advanced. Entries missing a cover URL, an artist or a
/// title are skipped without a download, so every yielded [`Album`] carries
/// real artwork. At most `limit` albums are yielded; truncating to the grid
/// size is the caller's job.
pub fn fetch_albums<'a, S: ScrobbleService>(
    service: &'a S,
    user: &str,
    period: Period,
    limit: u32,
) -> Result<impl Iterator<Item = Result<Album, FetchError>> + use<'a, S>, FetchError> {
    let entries = service.top_albums(user, period, limit)?;
    log::debug!("Last.fm returned {} top albums for {user}", entries.len());

    Ok(entries
        .into_iter()
        .take(limit as usize)
        .filter_map(usable_entry)
        .map(move |candidate| -> Result<Album, FetchError> {
            let cover_art = service.cover_art(&candidate.cover_url)?;
            Ok(Album {
                title: candidate.title,
                artist: candidate.artist,
                cover_art,
            })
        }))
}

/// An entry that passed metadata filtering but has no cover downloaded yet.
struct Candidate {
    title: String,
    artist: String,
    cover_url: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn usable_entry(entry: TopAlbum) -> Option<Candidate> {
    let rank = entry.rank;
    match (
        non_blank(entry.name),
        non_blank(entry.artist),
        non_blank(entry.cover_url),
    ) {
        (Some(title), Some(artist), Some(cover_url)) => Some(Candidate {
            title,
            artist,
            cover_url,
        }),
        (title, artist, cover) => {
            log::debug!(
                "skipping album #{rank}: title={} artist={} cover={}",
                title.is_some(),
                artist.is_some(),
                cover.is_some()
            );
            None
        }
    }
}

// =============================================================================
// HTTP client
// =============================================================================

/// [`ScrobbleService`] implementation backed by `ureq`.
pub struct LastFmClient {
    credentials: Credentials,
    api_root: String,
    http_client: ureq::Agent,
}

impl LastFmClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_api_root(credentials, API_ROOT)
    }

    /// Point the client at a different endpoint (e.g. a local stub).
    pub fn with_api_root(credentials: Credentials, api_root: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .build();
        Self {
            credentials,
            api_root: api_root.to_string(),
            http_client,
        }
    }

    fn top_albums_url(&self, user: &str, period: Period, limit: u32) -> String {
        let params = [
            ("method", "user.gettopalbums".to_string()),
            ("user", user.to_string()),
            ("period", period.as_str().to_string()),
            ("limit", limit.to_string()),
            ("api_key", self.credentials.api_key.clone()),
            ("format", "json".to_string()),
        ];
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        format!("{}?{}", self.api_root, query.join("&"))
    }

    fn request_json(&self, url: &str) -> Result<Value, FetchError> {
        match self.http_client.get(url).call() {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(status, response)) => {
                // Last.fm reports bad keys and unknown users as 4xx with a
                // JSON body; surface its message when there is one.
                match response.into_json::<Value>() {
                    Ok(body) => match api_error(&body) {
                        Some(err) => Err(err),
                        None => Err(FetchError::Http {
                            status,
                            url: redact(url),
                        }),
                    },
                    Err(_) => Err(FetchError::Http {
                        status,
                        url: redact(url),
                    }),
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchError::Transport(transport.to_string()))
            }
        }
    }
}

impl ScrobbleService for LastFmClient {
    fn top_albums(
        &self,
        user: &str,
        period: Period,
        limit: u32,
    ) -> Result<Vec<TopAlbum>, FetchError> {
        let url = self.top_albums_url(user, period, limit);
        log::debug!("GET {}", redact(&url));
        let body = self.request_json(&url)?;
        parse_top_albums(&body)
    }

    fn cover_art(&self, url: &str) -> Result<image::RgbaImage, FetchError> {
        log::debug!("GET {url}");
        let response = self.http_client.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::Http {
                status,
                url: url.to_string(),
            },
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        })?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_COVER_BYTES)
            .read_to_end(&mut bytes)?;
        decode_cover(url, &bytes)
    }
}

/// Decode downloaded cover bytes into RGBA.
pub fn decode_cover(url: &str, bytes: &[u8]) -> Result<image::RgbaImage, FetchError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
}

/// Strip the API key from a URL before it reaches logs or error messages.
fn redact(url: &str) -> String {
    match url.find("api_key=") {
        Some(start) => {
            let value_start = start + "api_key=".len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Extract a Last.fm `{"error": code, "message": "..."}` payload, if present.
fn api_error(body: &Value) -> Option<FetchError> {
    let code = body.get("error")?.as_i64()?;
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some(FetchError::Api { code, message })
}

/// Last.fm collapses one-element arrays into a bare object.
fn array_or_single(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

/// Numbers arrive as strings (`"playcount": "42"`) but tolerate real numbers.
fn lenient_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Parse one entry of `topalbums.album`.
fn parse_album(entry: &Value) -> TopAlbum {
    let artist = match entry.get("artist") {
        Some(Value::Object(obj)) => {
            string_field(obj.get("name")).or_else(|| string_field(obj.get("#text")))
        }
        Some(Value::String(name)) => Some(name.clone()),
        _ => None,
    };
    // Sizes are listed small → extralarge; keep the largest non-empty one.
    let cover_url = array_or_single(entry.get("image"))
        .into_iter()
        .filter_map(|img| img.get("#text").and_then(Value::as_str))
        .filter(|url| !url.trim().is_empty())
        .last()
        .map(str::to_string);

    TopAlbum {
        name: string_field(entry.get("name")),
        artist,
        playcount: lenient_u64(entry.get("playcount")),
        rank: u32::try_from(lenient_u64(
            entry.get("@attr").and_then(|attr| attr.get("rank")),
        ))
        .unwrap_or(0),
        cover_url,
    }
}

/// Parse a `user.getTopAlbums` JSON response.
pub fn parse_top_albums(body: &Value) -> Result<Vec<TopAlbum>, FetchError> {
    if let Some(err) = api_error(body) {
        return Err(err);
    }
    let top = body
        .get("topalbums")
        .ok_or_else(|| FetchError::Malformed("missing `topalbums` object".into()))?;
    Ok(array_or_single(top.get("album"))
        .into_iter()
        .map(parse_album)
        .collect())
}
