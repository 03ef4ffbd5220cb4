//! Small helpers shared by front ends.

use crate::backend::TrackKey;
use crate::state::Update;

/// Key of the track an update belongs to, `None` when nothing is selected.
pub fn track_id(update: &Update) -> Option<TrackKey> {
    update.snapshot.as_ref().and_then(|s| s.track_key())
}

/// Format seconds as `m:ss`. Non-finite or negative input shows `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}
