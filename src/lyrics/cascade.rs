//! Cascading catalog lookup.
//!
//! `plan` turns a cleaned query into an ordered list of strategies (pure, no
//! I/O). `LyricsFetcher::fetch` walks that list against a `LyricsCatalog`,
//! stopping at the first stage that yields lyrics. A transport or decode
//! failure ends the walk with `LyricsResult::Error` so callers can tell "try
//! again" apart from "nothing exists".

use crate::lyrics::clean::{LyricsQuery, ultra_clean};
use crate::lyrics::providers::{CatalogEntry, LyricsCatalog};
use crate::lyrics::similarity::match_confidence;
use crate::lyrics::types::{LyricsError, LyricsResult, MatchStage};

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Exact(LyricsQuery),
    Search { stage: MatchStage, q: String },
}

impl Strategy {
    pub fn stage(&self) -> MatchStage {
        match self {
            Strategy::Exact(_) => MatchStage::Exact,
            Strategy::Search { stage, .. } => *stage,
        }
    }

    fn is_runnable(&self) -> bool {
        match self {
            Strategy::Exact(q) => !q.title.is_empty(),
            Strategy::Search { q, .. } => !q.is_empty(),
        }
    }
}

/// Ordered lookup plan for a query. Stages with nothing to search for are
/// left out.
pub fn plan(query: &LyricsQuery) -> Vec<Strategy> {
    let known_artist = query.artist_is_known();
    let combined = if known_artist {
        format!("{} {}", query.artist, query.title).trim().to_string()
    } else {
        query.title.clone()
    };

    let mut stages = vec![
        Strategy::Exact(query.clone()),
        Strategy::Search { stage: MatchStage::Combined, q: combined },
    ];
    if known_artist {
        stages.push(Strategy::Search { stage: MatchStage::TitleOnly, q: query.title.clone() });
    }
    stages.push(Strategy::Search { stage: MatchStage::UltraClean, q: ultra_clean(&query.title) });
    stages.retain(Strategy::is_runnable);
    stages
}

/// First candidate with synced lyrics, else the first candidate. Catalog
/// order is otherwise preserved.
pub fn select_candidate(entries: Vec<CatalogEntry>) -> Option<CatalogEntry> {
    let idx = entries.iter().position(CatalogEntry::has_synced).unwrap_or(0);
    entries.into_iter().nth(idx)
}

pub struct LyricsFetcher<C> {
    catalog: C,
}

impl<C: LyricsCatalog> LyricsFetcher<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub async fn fetch(&self, query: &LyricsQuery) -> LyricsResult {
        for strategy in plan(query) {
            let stage = strategy.stage();
            tracing::debug!(%stage, ?strategy, "lyrics lookup");
            match self.run(&strategy).await {
                Ok(Some(entry)) => match entry.to_document() {
                    Some(document) => {
                        let confidence = match_confidence(query, &entry);
                        tracing::info!(
                            %stage,
                            confidence,
                            track = entry.track_name.as_deref().unwrap_or_default(),
                            artist = entry.artist_name.as_deref().unwrap_or_default(),
                            "lyrics found"
                        );
                        return LyricsResult::Found { document, confidence, stage };
                    }
                    None => tracing::debug!(%stage, "match has no lyric body"),
                },
                Ok(None) => tracing::debug!(%stage, "no match"),
                Err(e) => {
                    tracing::warn!(%stage, error = %e, "lyrics lookup failed");
                    return LyricsResult::Error(e);
                }
            }
        }
        tracing::info!(title = %query.title, artist = %query.artist, "no lyrics found");
        LyricsResult::NotFound
    }

    async fn run(&self, strategy: &Strategy) -> Result<Option<CatalogEntry>, LyricsError> {
        match strategy {
            Strategy::Exact(q) => self.catalog.get(q).await,
            Strategy::Search { q, .. } => Ok(select_candidate(self.catalog.search(q).await?)),
        }
    }
}
