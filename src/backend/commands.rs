use crate::backend::connection::BackendError;
use crate::backend::snapshot::AuthoritativeSnapshot;
use crate::timer::sanitize_position;
use reqwest::Method;
use serde::Deserialize;

/// A discrete user action sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(usize),
    Toggle,
    Next,
    Prev,
    Shuffle,
    Repeat,
    Volume(u8),
    Seek(f64),
    DeleteTrack(usize),
}

impl Command {
    pub fn volume(percent: i64) -> Self {
        Command::Volume(percent.clamp(0, 100) as u8)
    }

    pub fn seek(seconds: f64) -> Self {
        Command::Seek(sanitize_position(seconds))
    }

    pub fn method(&self) -> Method {
        match self {
            Command::DeleteTrack(_) => Method::DELETE,
            _ => Method::POST,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Command::Play(idx) => format!("play/{idx}"),
            Command::Toggle => "toggle".to_string(),
            Command::Next => "next".to_string(),
            Command::Prev => "prev".to_string(),
            Command::Shuffle => "shuffle".to_string(),
            Command::Repeat => "repeat".to_string(),
            Command::Volume(v) => format!("volume/{v}"),
            Command::Seek(s) => format!("seek/{s}"),
            Command::DeleteTrack(idx) => format!("track/{idx}"),
        }
    }
}

/// Raw command reply. Endpoints answer either with a full state or with the
/// one field they changed.
#[derive(Debug, Default, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub state: Option<AuthoritativeSnapshot>,
    #[serde(default)]
    pub is_playing: Option<bool>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub shuffle: Option<bool>,
    #[serde(default)]
    pub repeat: Option<bool>,
}

/// Fields a partial reply reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialUpdate {
    pub is_playing: Option<bool>,
    pub volume: Option<u8>,
    pub shuffle: Option<bool>,
    pub repeat: Option<bool>,
}

impl PartialUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PartialUpdate::default()
    }

    /// Complete candidate: a copy of `base` with the reported fields replaced.
    /// Partial replies never report a position, so the candidate has none.
    pub fn apply_to(&self, base: &AuthoritativeSnapshot) -> AuthoritativeSnapshot {
        let mut snapshot = AuthoritativeSnapshot { position: None, ..base.clone() };
        if let Some(playing) = self.is_playing {
            snapshot.is_playing = playing;
        }
        if let Some(volume) = self.volume {
            snapshot.volume = volume;
        }
        if let Some(shuffle) = self.shuffle {
            snapshot.shuffle = shuffle;
        }
        if let Some(repeat) = self.repeat {
            snapshot.repeat = repeat;
        }
        snapshot
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Snapshot(AuthoritativeSnapshot),
    Partial(PartialUpdate),
    /// Success without any state in the reply.
    Acknowledged,
}

impl CommandResponse {
    pub fn into_outcome(self) -> Result<CommandOutcome, BackendError> {
        if self.success == Some(false) {
            let reason = self.error.unwrap_or_else(|| "command failed".to_string());
            return Err(BackendError::Command(reason));
        }
        if let Some(state) = self.state {
            return Ok(CommandOutcome::Snapshot(state.normalize()));
        }
        let partial = PartialUpdate {
            is_playing: self.is_playing,
            volume: self
                .volume
                .filter(|v| v.is_finite())
                .map(|v| v.round().clamp(0.0, 100.0) as u8),
            shuffle: self.shuffle,
            repeat: self.repeat,
        };
        if partial.is_empty() {
            Ok(CommandOutcome::Acknowledged)
        } else {
            Ok(CommandOutcome::Partial(partial))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(json: &str) -> Result<CommandOutcome, BackendError> {
        serde_json::from_str::<CommandResponse>(json).unwrap().into_outcome()
    }

    #[test]
    fn paths_and_methods() {
        assert_eq!(Command::Play(3).path(), "play/3");
        assert_eq!(Command::volume(250).path(), "volume/100");
        assert_eq!(Command::seek(-5.0).path(), "seek/0");
        assert_eq!(Command::seek(61.5).path(), "seek/61.5");
        assert_eq!(Command::DeleteTrack(2).method(), Method::DELETE);
        assert_eq!(Command::Next.method(), Method::POST);
    }

    #[test]
    fn full_state_reply() {
        let out = outcome(r#"{"success": true, "state": {"tracks": [{"name": "a"}], "current_idx": 0}}"#).unwrap();
        match out {
            CommandOutcome::Snapshot(s) => assert_eq!(s.current_track().unwrap().name, "a"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn toggle_reply_is_partial() {
        let out = outcome(r#"{"is_playing": false}"#).unwrap();
        let base = AuthoritativeSnapshot {
            is_playing: true,
            volume: 30,
            position: Some(12.0),
            ..Default::default()
        };
        match out {
            CommandOutcome::Partial(p) => {
                let next = p.apply_to(&base);
                assert!(!next.is_playing);
                assert_eq!(next.volume, 30);
                assert_eq!(next.position, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failure_reply_is_error() {
        let err = outcome(r#"{"success": false, "error": "Invalid folder"}"#).unwrap_err();
        assert!(matches!(err, BackendError::Command(ref m) if m == "Invalid folder"));
        // `success: false` wins even when a state is attached.
        assert!(outcome(r#"{"success": false, "state": {}}"#).is_err());
    }

    #[test]
    fn bare_success_is_acknowledged() {
        assert_eq!(outcome(r#"{"success": true}"#).unwrap(), CommandOutcome::Acknowledged);
    }
}
