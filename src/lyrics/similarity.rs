use crate::lyrics::clean::LyricsQuery;
use crate::lyrics::providers::CatalogEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const TITLE_WEIGHT: f64 = 0.6;
const ARTIST_WEIGHT: f64 = 0.3;
const DURATION_WEIGHT: f64 = 0.1;
/// A duration mismatch at or beyond this many seconds scores zero.
const DURATION_SPAN_SECS: f64 = 10.0;

fn normalize_string(s: &str) -> String {
    let lower = s.to_lowercase();
    let replaced = NON_WORD_RE.replace_all(&lower, " ");
    WHITESPACE_RE.replace_all(&replaced, " ").trim().to_string()
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

fn dice_coefficient(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_string(a), normalize_string(b));
    if a == b {
        return 1.0;
    }
    let (a_grams, b_grams) = (bigrams(&a), bigrams(&b));
    if a_grams.is_empty() || b_grams.is_empty() {
        return 0.0;
    }
    let inter = a_grams.intersection(&b_grams).count() as f64;
    (2.0 * inter) / ((a_grams.len() + b_grams.len()) as f64)
}

fn duration_score(query: f64, candidate: f64) -> f64 {
    1.0 - ((query - candidate).abs() / DURATION_SPAN_SECS).min(1.0)
}

/// How closely a catalog entry resembles the query, in `0.0..=1.0`.
///
/// Purely informational: the cascade never reorders candidates by it.
/// Components the query cannot speak to (unknown artist, missing duration)
/// are left out and the remaining weights renormalized.
pub fn match_confidence(query: &LyricsQuery, entry: &CatalogEntry) -> f64 {
    let mut total = 0.0;
    let mut weight = 0.0;

    if let Some(title) = entry.track_name.as_deref() {
        total += TITLE_WEIGHT * dice_coefficient(&query.title, title);
        weight += TITLE_WEIGHT;
    }
    if query.artist_is_known()
        && let Some(artist) = entry.artist_name.as_deref()
    {
        total += ARTIST_WEIGHT * dice_coefficient(&query.artist, artist);
        weight += ARTIST_WEIGHT;
    }
    if let (Some(q), Some(c)) = (query.duration, entry.duration) {
        total += DURATION_WEIGHT * duration_score(q, c);
        weight += DURATION_WEIGHT;
    }

    if weight == 0.0 { 0.0 } else { (total / weight).clamp(0.0, 1.0) }
}
