pub mod lrclib;

use crate::lyrics::clean::LyricsQuery;
use crate::lyrics::parse::{parse_lrc, parse_plain};
use crate::lyrics::types::{LyricsDocument, LyricsError};
use serde::Deserialize;
use std::future::Future;

pub use lrclib::LrclibClient;

/// One record from the lyrics catalog. Either body may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

impl CatalogEntry {
    pub fn has_synced(&self) -> bool {
        self.synced_lyrics.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Synced body if it yields any line, otherwise the plain body. `None`
    /// when neither produces text (instrumentals, empty records).
    pub fn to_document(&self) -> Option<LyricsDocument> {
        if let Some(synced) = self.synced_lyrics.as_deref() {
            let doc = parse_lrc(synced);
            if !doc.is_empty() {
                return Some(doc);
            }
        }
        self.plain_lyrics
            .as_deref()
            .map(parse_plain)
            .filter(|doc| !doc.is_empty())
    }
}

/// Lookup surface of an external lyrics catalog.
///
/// `get` is the exact-match endpoint and returns `Ok(None)` on a miss;
/// `search` returns candidates in catalog order.
pub trait LyricsCatalog: Send + Sync {
    fn get(
        &self,
        query: &LyricsQuery,
    ) -> impl Future<Output = Result<Option<CatalogEntry>, LyricsError>> + Send;

    fn search(&self, q: &str) -> impl Future<Output = Result<Vec<CatalogEntry>, LyricsError>> + Send;
}
