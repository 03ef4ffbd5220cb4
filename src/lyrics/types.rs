use once_cell::sync::Lazy;
use reqwest::Client;
use std::cmp::Ordering;
use thiserror::Error;

// Shared HTTP client for catalog requests. No request timeout: a hung stage
// leaves the panel loading until the track changes or the user retries.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("palmsync/0.1")
        .build()
        .expect("failed to build HTTP client")
});

/// Timestamp of a lyric line. Plain (unsynced) lines carry no time and sort
/// before every timed line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LyricTime {
    Untimed,
    Timed(f64),
}

impl LyricTime {
    /// Total order used for document sorting: `Untimed` is less than any
    /// timed value. NaN never reaches here since the parser only produces
    /// finite times.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LyricTime::Untimed, LyricTime::Untimed) => Ordering::Equal,
            (LyricTime::Untimed, LyricTime::Timed(_)) => Ordering::Less,
            (LyricTime::Timed(_), LyricTime::Untimed) => Ordering::Greater,
            (LyricTime::Timed(a), LyricTime::Timed(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub time: LyricTime,
    pub text: String,
}

impl LyricLine {
    pub fn timed(time: f64, text: impl Into<String>) -> Self {
        Self { time: LyricTime::Timed(time), text: text.into() }
    }

    pub fn untimed(text: impl Into<String>) -> Self {
        Self { time: LyricTime::Untimed, text: text.into() }
    }
}

/// Ordered, time-indexed lyrics for one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricsDocument {
    pub lines: Vec<LyricLine>,
}

impl LyricsDocument {
    /// Build a document, enforcing the ordering invariant with a stable sort.
    pub fn new(mut lines: Vec<LyricLine>) -> Self {
        lines.sort_by(|a, b| a.time.sort_cmp(&b.time));
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_synced(&self) -> bool {
        self.lines.iter().any(|l| matches!(l.time, LyricTime::Timed(_)))
    }

    /// Index of the line that should be highlighted at `clock` seconds.
    ///
    /// Scans backwards and returns the last timed line whose time does not
    /// exceed the clock, so two lines sharing a timestamp resolve to the later
    /// one. Returns `None` before the first timed line, for documents without
    /// timed lines, and for a NaN clock.
    pub fn active_index(&self, clock: f64) -> Option<usize> {
        if clock.is_nan() {
            return None;
        }
        self.lines
            .iter()
            .enumerate()
            .rev()
            .find(|(_, line)| matches!(line.time, LyricTime::Timed(t) if t <= clock))
            .map(|(idx, _)| idx)
    }
}

/// Which cascade stage produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Exact,
    Combined,
    TitleOnly,
    UltraClean,
}

impl std::fmt::Display for MatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchStage::Exact => "exact",
            MatchStage::Combined => "combined",
            MatchStage::TitleOnly => "title-only",
            MatchStage::UltraClean => "ultra-clean",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Outcome of a full cascade run.
#[derive(Debug)]
pub enum LyricsResult {
    Found {
        document: LyricsDocument,
        /// Similarity between the query and the chosen catalog entry, 0.0..=1.0.
        confidence: f64,
        stage: MatchStage,
    },
    NotFound,
    Error(LyricsError),
}

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untimed_lines_sort_first_and_keep_order() {
        let doc = LyricsDocument::new(vec![
            LyricLine::timed(3.0, "c"),
            LyricLine::untimed("a"),
            LyricLine::timed(1.0, "b"),
            LyricLine::untimed("z"),
        ]);
        let texts: Vec<_> = doc.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "z", "b", "c"]);
    }

    #[test]
    fn active_index_prefers_later_line_on_tie() {
        let doc = LyricsDocument::new(vec![
            LyricLine::timed(1.0, "first"),
            LyricLine::timed(2.0, "dup a"),
            LyricLine::timed(2.0, "dup b"),
        ]);
        assert_eq!(doc.active_index(2.0), Some(2));
        assert_eq!(doc.active_index(1.5), Some(0));
        assert_eq!(doc.active_index(0.5), None);
    }

    #[test]
    fn active_index_none_without_timed_lines() {
        let doc = LyricsDocument::new(vec![LyricLine::untimed("only plain")]);
        assert_eq!(doc.active_index(100.0), None);
        assert!(!doc.is_synced());
    }

    #[test]
    fn active_index_nan_clock() {
        let doc = LyricsDocument::new(vec![LyricLine::timed(0.0, "x")]);
        assert_eq!(doc.active_index(f64::NAN), None);
    }
}
