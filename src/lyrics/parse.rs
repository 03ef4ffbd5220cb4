use crate::lyrics::types::{LyricLine, LyricsDocument};
use once_cell::sync::Lazy;
use regex::Regex;

// One leading `[m:ss]` or `[m:ss.frac]` tag.
static LRC_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+):(\d+(?:\.\d+)?)\]").unwrap());

/// Parse time-tagged LRC text into an ordered document.
///
/// Tagged lines with text become timed lines. Untagged, non-blank lines that do
/// not start with `[` are kept as untimed lines (intros, credits). Blank lines,
/// tag-only lines and anything else bracketed (metadata such as `[ar:...]` or a
/// malformed stamp) are skipped without aborting the parse.
pub fn parse_lrc(raw: &str) -> LyricsDocument {
    let mut lines = Vec::new();
    for line in raw.lines() {
        if let Some(cap) = LRC_TAG_RE.captures(line) {
            let Some(time) = tag_seconds(&cap) else {
                continue;
            };
            let text = line[cap[0].len()..].trim();
            if !text.is_empty() {
                lines.push(LyricLine::timed(time, text));
            }
        } else if !line.starts_with('[') && !line.trim().is_empty() {
            lines.push(LyricLine::untimed(line.trim()));
        }
    }
    LyricsDocument::new(lines)
}

/// Plain lyrics have no timing at all; every non-blank line is untimed.
pub fn parse_plain(raw: &str) -> LyricsDocument {
    let lines = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(LyricLine::untimed)
        .collect();
    LyricsDocument::new(lines)
}

fn tag_seconds(cap: &regex::Captures<'_>) -> Option<f64> {
    let minutes = cap.get(1)?.as_str().parse::<u32>().ok()?;
    let seconds = cap.get(2)?.as_str().parse::<f64>().ok()?;
    let time = minutes as f64 * 60.0 + seconds;
    time.is_finite().then_some(time)
}
