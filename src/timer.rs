use std::time::Duration;

/// Period of the local clock tick while playing.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Drift beyond this is corrected by snapping to the reported position;
/// anything smaller is left alone so the display does not jump.
pub const SNAP_THRESHOLD_SECS: f64 = 0.5;

/// Locally advancing playback clock between authoritative reports.
#[derive(Debug, PartialEq, Default)]
pub struct PositionInterpolator {
    /// Unclamped interpolated position in seconds.
    raw: f64,
    playing: bool,
    /// Track length for display clamping, if known.
    duration: Option<f64>,
}

impl PositionInterpolator {
    /// Re-synchronize from an accepted snapshot.
    pub fn reseed(&mut self, position: f64, playing: bool) {
        let position = sanitize_position(position);
        self.playing = playing;
        if !playing || (self.raw - position).abs() > SNAP_THRESHOLD_SECS {
            self.raw = position;
        }
    }

    /// Follow a play-state change from a snapshot without a position. The
    /// clock keeps its interpolated value.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Advance by one tick. Does nothing while paused.
    pub fn tick(&mut self) {
        if self.playing {
            self.raw += TICK_INTERVAL.as_secs_f64();
        }
    }

    /// Jump straight to a seek target before the backend confirms it.
    pub fn seek_to(&mut self, target: f64) {
        self.raw = sanitize_position(target);
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| d.is_finite() && *d > 0.0);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Unclamped value, used for drift comparison.
    pub fn raw(&self) -> f64 {
        self.raw
    }

    /// Display position, clamped to `[0, duration]`.
    pub fn position(&self) -> f64 {
        match self.duration {
            Some(d) => self.raw.clamp(0.0, d),
            None => self.raw.max(0.0),
        }
    }
}

pub fn sanitize_position(p: f64) -> f64 {
    if p.is_nan() || !p.is_finite() {
        0.0
    } else if p < 0.0 {
        // Negative positions are not meaningful; clamp to zero.
        0.0
    } else {
        p
    }
}
