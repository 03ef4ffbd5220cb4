//! Player state as reported by the backend.

use crate::timer::sanitize_position;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One library entry. `index` is its position in the authoritative track
/// list; every sorted or filtered view maps back through it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    /// Formatted as `m:ss`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration: String,
    #[serde(skip)]
    pub index: usize,
}

impl Track {
    pub fn duration_secs(&self) -> Option<f64> {
        parse_duration(&self.duration)
    }
}

/// Identity of the playing track, used to discard stale lyric results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub index: usize,
    pub name: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthoritativeSnapshot {
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// -1 when nothing is selected.
    #[serde(default = "no_track")]
    pub current_idx: i64,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default = "default_volume", deserialize_with = "volume_percent")]
    pub volume: u8,
    /// Absent from backends that do not report playback position.
    #[serde(default)]
    pub position: Option<f64>,
}

impl Default for AuthoritativeSnapshot {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            current_idx: no_track(),
            is_playing: false,
            shuffle: false,
            repeat: false,
            volume: default_volume(),
            position: None,
        }
    }
}

impl AuthoritativeSnapshot {
    /// Assign stable track indices and sanitize the position, if any. Every snapshot
    /// goes through this on receipt.
    pub fn normalize(mut self) -> Self {
        for (idx, track) in self.tracks.iter_mut().enumerate() {
            track.index = idx;
        }
        self.position = self.position.map(sanitize_position);
        self
    }

    pub fn current_track(&self) -> Option<&Track> {
        usize::try_from(self.current_idx).ok().and_then(|idx| self.tracks.get(idx))
    }

    pub fn track_key(&self) -> Option<TrackKey> {
        self.current_track().map(|t| TrackKey {
            index: t.index,
            name: t.name.clone(),
            artist: t.artist.clone(),
        })
    }
}

fn no_track() -> i64 {
    -1
}

fn default_volume() -> u8 {
    50
}

fn volume_percent<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(d)?;
    Ok(if raw.is_finite() { raw.round().clamp(0.0, 100.0) as u8 } else { default_volume() })
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Parse `m:ss`, `h:mm:ss` or bare seconds. Zero and garbage give `None`.
pub fn parse_duration(s: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in s.trim().split(':') {
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    (total > 0.0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_state() {
        let json = r#"{
            "tracks": [
                {"name": "One", "artist": "A", "album": "X", "year": 1999, "duration": "3:25"},
                {"name": "Two", "filename": "two.mp3"}
            ],
            "current_idx": 1,
            "current_track": "Two",
            "is_playing": true,
            "volume": 70,
            "shuffle": false,
            "repeat": true,
            "position": 12.5
        }"#;
        let snap: AuthoritativeSnapshot = serde_json::from_str::<AuthoritativeSnapshot>(json).unwrap().normalize();
        assert_eq!(snap.tracks.len(), 2);
        assert_eq!(snap.tracks[0].year, "1999");
        assert_eq!(snap.tracks[0].duration_secs(), Some(205.0));
        assert_eq!(snap.current_track().map(|t| t.index), Some(1));
        assert_eq!(snap.volume, 70);
        assert!(snap.repeat);
        assert_eq!(snap.position, Some(12.5));
    }

    #[test]
    fn position_is_optional() {
        let json = r#"{"tracks": [], "current_idx": -1, "is_playing": true, "volume": 50}"#;
        let snap: AuthoritativeSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.normalize().position, None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let snap: AuthoritativeSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snap, AuthoritativeSnapshot::default());
        assert!(snap.current_track().is_none());
        assert!(snap.track_key().is_none());
    }

    #[test]
    fn volume_is_clamped() {
        let snap: AuthoritativeSnapshot = serde_json::from_str(r#"{"volume": 140}"#).unwrap();
        assert_eq!(snap.volume, 100);
    }

    #[test]
    fn normalize_sanitizes_position() {
        let snap = AuthoritativeSnapshot { position: Some(-3.0), ..Default::default() }.normalize();
        assert_eq!(snap.position, Some(0.0));
    }

    #[test]
    fn duration_formats() {
        assert_eq!(parse_duration("0:07"), Some(7.0));
        assert_eq!(parse_duration("1:02:03"), Some(3723.0));
        assert_eq!(parse_duration("215"), Some(215.0));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("0:00"), None);
        assert_eq!(parse_duration("abc"), None);
    }
}
