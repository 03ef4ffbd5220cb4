//! Query normalization for catalog lookups.
//!
//! Library metadata often comes from file names ("Song (Official Video) - HD"),
//! which rarely match a catalog entry verbatim. `clean_query` strips that noise
//! deterministically; `ultra_clean` is the last-resort ASCII-only form.

use crate::backend::Track;
use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:official|video|audio|lyrics|full song|hd|4k)\b").unwrap()
});
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 ]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Checked in this order; the first one present wins, even if a later one
/// occurs earlier in the string.
const SEPARATORS: [&str; 5] = [" - ", " | ", " : ", " – ", " — "];

pub fn clean_query(input: &str) -> String {
    let stripped = BRACKETED_RE.replace_all(input, "");
    let mut cleaned: &str = &stripped;
    if let Some(sep) = SEPARATORS.iter().find(|sep| cleaned.contains(*sep))
        && let Some((head, _)) = cleaned.split_once(*sep)
    {
        cleaned = head;
    }
    NOISE_RE.replace_all(cleaned, "").trim().to_string()
}

pub fn ultra_clean(input: &str) -> String {
    let ascii = NON_ALNUM_RE.replace_all(input, " ");
    WHITESPACE_RE.replace_all(&ascii, " ").trim().to_string()
}

/// Cleaned lookup key derived from a track.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricsQuery {
    pub artist: String,
    pub title: String,
    pub duration: Option<f64>,
}

impl LyricsQuery {
    pub fn new(artist: &str, title: &str, duration: Option<f64>) -> Self {
        Self {
            artist: clean_query(artist),
            title: clean_query(title),
            duration,
        }
    }

    pub fn from_track(track: &Track) -> Self {
        Self::new(&track.artist, &track.name, track.duration_secs())
    }

    /// False for blank artists and placeholder tags like "Unknown Artist".
    pub fn artist_is_known(&self) -> bool {
        !self.artist.is_empty() && !self.artist.to_lowercase().contains("unknown")
    }
}
