// state.rs: displayed player state, snapshot reconciliation and lyric tracking

use crate::backend::{AuthoritativeSnapshot, TrackKey};
use crate::lyrics::{LyricsDocument, LyricsResult, MatchStage};
use crate::timer::PositionInterpolator;
use std::sync::Arc;

/// A polled position closer than this to the displayed one is noise.
pub const ACCEPT_POSITION_TOLERANCE_SECS: f64 = 1.5;

/// Where a candidate snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Periodic background refresh; subject to change suppression.
    Poll,
    /// Direct reply to a user command; always accepted.
    Command,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotChange {
    pub track_changed: bool,
    pub playback_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted(SnapshotChange),
    Rejected,
}

/// True when `candidate` carries a change worth showing: a different list
/// length, play state, track, shuffle, repeat or volume, or a position more
/// than `ACCEPT_POSITION_TOLERANCE_SECS` away. A missing position counts as 0.
pub fn differs_beyond_tolerance(displayed: &AuthoritativeSnapshot, candidate: &AuthoritativeSnapshot) -> bool {
    displayed.tracks.len() != candidate.tracks.len()
        || displayed.is_playing != candidate.is_playing
        || displayed.current_idx != candidate.current_idx
        || displayed.shuffle != candidate.shuffle
        || displayed.repeat != candidate.repeat
        || displayed.volume != candidate.volume
        || (candidate.position.unwrap_or(0.0) - displayed.position.unwrap_or(0.0)).abs()
            > ACCEPT_POSITION_TOLERANCE_SECS
}

/// Sole writer of the displayed player state.
///
/// Holds the last accepted snapshot and the interpolated clock seeded from
/// it. Nothing is displayed until a first snapshot has been accepted.
#[derive(Debug, Default)]
pub struct StateReconciler {
    displayed: Option<Arc<AuthoritativeSnapshot>>,
    clock: PositionInterpolator,
    /// Clock value before a pending optimistic seek.
    pre_seek: Option<f64>,
}

impl StateReconciler {
    /// Only a snapshot that reports a position reseeds the clock; one without
    /// just updates the play state. Its stored position stays the last one
    /// reported so later polls compare against something real.
    pub fn accept(&mut self, mut candidate: AuthoritativeSnapshot, origin: Origin) -> Acceptance {
        if origin == Origin::Poll
            && let Some(displayed) = &self.displayed
            && !differs_beyond_tolerance(displayed, &candidate)
        {
            return Acceptance::Rejected;
        }

        let change = SnapshotChange {
            track_changed: self.displayed.as_ref().and_then(|d| d.track_key()) != candidate.track_key(),
            playback_changed: self.displayed.as_ref().map(|d| d.is_playing) != Some(candidate.is_playing),
        };
        self.clock
            .set_duration(candidate.current_track().and_then(|t| t.duration_secs()));
        match candidate.position {
            Some(position) => self.clock.reseed(position, candidate.is_playing),
            None => {
                self.clock.set_playing(candidate.is_playing);
                candidate.position = self.displayed.as_ref().and_then(|d| d.position);
            }
        }
        self.pre_seek = None;
        self.displayed = Some(Arc::new(candidate));
        Acceptance::Accepted(change)
    }

    pub fn displayed(&self) -> Option<&Arc<AuthoritativeSnapshot>> {
        self.displayed.as_ref()
    }

    pub fn clock(&self) -> &PositionInterpolator {
        &self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Optimistic clock jump for a pending seek.
    pub fn begin_seek(&mut self, target: f64) {
        self.pre_seek.get_or_insert(self.clock.raw());
        self.clock.seek_to(target);
    }

    /// Undo an optimistic seek after the backend refused it.
    pub fn abort_seek(&mut self) {
        if let Some(position) = self.pre_seek.take() {
            self.clock.seek_to(position);
        }
    }

    pub fn current_track_key(&self) -> Option<TrackKey> {
        self.displayed.as_ref().and_then(|d| d.track_key())
    }
}

/// What the lyrics panel should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LyricsView {
    /// Panel closed or nothing playing.
    #[default]
    Hidden,
    Loading,
    Ready {
        document: Arc<LyricsDocument>,
        confidence: f64,
        stage: MatchStage,
    },
    NotFound,
    /// Fetch failed; distinct from `NotFound` so a retry makes sense.
    Failed(String),
}

/// Lyrics for the current track plus the highlighted line.
#[derive(Debug, Default)]
pub struct LyricState {
    pub view: LyricsView,
    /// Track the current view (or pending fetch) belongs to.
    key: Option<TrackKey>,
    pub index: Option<usize>,
}

impl LyricState {
    /// Line to highlight at `position`. Before the first timed line of a
    /// synced document the top line keeps focus; plain documents have none.
    pub fn get_index(&self, position: f64) -> Option<usize> {
        match &self.view {
            LyricsView::Ready { document, .. } if document.is_synced() => {
                document.active_index(position).or(Some(0))
            }
            _ => None,
        }
    }

    /// Returns true when the highlighted line moved (scroll trigger).
    pub fn update_index(&mut self, position: f64) -> bool {
        let new_index = self.get_index(position);
        if new_index != self.index {
            self.index = new_index;
            true
        } else {
            false
        }
    }

    pub fn begin_loading(&mut self, key: TrackKey) {
        self.key = Some(key);
        self.view = LyricsView::Loading;
        self.index = None;
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.view = LyricsView::Hidden;
        self.index = None;
    }

    pub fn key(&self) -> Option<&TrackKey> {
        self.key.as_ref()
    }

    /// Store a fetch result if it belongs to the track we are waiting on.
    /// Late results for an older track are dropped and `false` is returned.
    pub fn apply_result(&mut self, key: &TrackKey, result: LyricsResult) -> bool {
        if self.key.as_ref() != Some(key) || self.view != LyricsView::Loading {
            return false;
        }
        self.view = match result {
            LyricsResult::Found { document, confidence, stage } => LyricsView::Ready {
                document: Arc::new(document),
                confidence,
                stage,
            },
            LyricsResult::NotFound => LyricsView::NotFound,
            LyricsResult::Error(e) => LyricsView::Failed(e.to_string()),
        };
        self.index = None;
        true
    }
}

/// Snapshot of everything a front end renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub snapshot: Option<Arc<AuthoritativeSnapshot>>,
    /// Interpolated, display-clamped position.
    pub position: f64,
    pub playing: bool,
    pub lyrics: LyricsView,
    pub index: Option<usize>,
    /// Set only on the update where the highlighted line changed.
    pub scroll_to: Option<usize>,
    /// Transient message, e.g. a rejected command.
    pub notice: Option<String>,
    pub version: u64, // Incremented on any state change
}

/// Bundles all state owned by the player task, plus versioning.
#[derive(Debug, Default)]
pub struct StateBundle {
    pub reconciler: StateReconciler,
    pub lyric_state: LyricState,
    pub panel_open: bool,
    pub notice: Option<String>,
    pub version: u64,
}

impl StateBundle {
    pub fn new(panel_open: bool) -> Self {
        Self { panel_open, ..Default::default() }
    }

    pub fn accept(&mut self, candidate: AuthoritativeSnapshot, origin: Origin) -> Acceptance {
        let acceptance = self.reconciler.accept(candidate, origin);
        if let Acceptance::Accepted(_) = acceptance {
            self.version += 1;
        }
        acceptance
    }

    pub fn tick(&mut self) -> bool {
        self.reconciler.tick();
        self.version += 1;
        self.update_index()
    }

    pub fn update_index(&mut self) -> bool {
        let changed = self.lyric_state.update_index(self.reconciler.clock().raw());
        if changed {
            self.version += 1;
        }
        changed
    }

    pub fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
        self.version += 1;
    }

    pub fn to_update(&self, scroll: bool) -> Update {
        Update {
            snapshot: self.reconciler.displayed().cloned(),
            position: self.reconciler.clock().position(),
            playing: self.reconciler.is_playing(),
            lyrics: self.lyric_state.view.clone(),
            index: self.lyric_state.index,
            scroll_to: if scroll { self.lyric_state.index } else { None },
            notice: self.notice.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Track;
    use crate::lyrics::parse::parse_lrc;

    fn track(name: &str) -> Track {
        Track { name: name.into(), artist: "A".into(), duration: "3:00".into(), ..Default::default() }
    }

    fn snapshot(position: f64, playing: bool) -> AuthoritativeSnapshot {
        AuthoritativeSnapshot {
            tracks: vec![track("one"), track("two")],
            current_idx: 0,
            is_playing: playing,
            position: Some(position),
            ..Default::default()
        }
        .normalize()
    }

    #[test]
    fn first_snapshot_is_always_accepted() {
        let mut r = StateReconciler::default();
        assert!(r.displayed().is_none());
        let acceptance = r.accept(snapshot(1.0, false), Origin::Poll);
        assert_eq!(
            acceptance,
            Acceptance::Accepted(SnapshotChange { track_changed: true, playback_changed: true })
        );
    }

    #[test]
    fn poll_within_tolerance_is_rejected() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(10.0, true), Origin::Poll);
        let before = r.displayed().cloned();
        assert_eq!(r.accept(snapshot(11.5, true), Origin::Poll), Acceptance::Rejected);
        assert_eq!(r.accept(snapshot(8.6, true), Origin::Poll), Acceptance::Rejected);
        assert_eq!(r.displayed().cloned(), before);
    }

    #[test]
    fn poll_beyond_tolerance_is_accepted() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(10.0, true), Origin::Poll);
        assert!(matches!(r.accept(snapshot(11.6, true), Origin::Poll), Acceptance::Accepted(_)));
        assert_eq!(r.displayed().unwrap().position, Some(11.6));
    }

    #[test]
    fn any_field_change_is_accepted() {
        let base = snapshot(10.0, true);
        let variants = [
            AuthoritativeSnapshot { is_playing: false, ..base.clone() },
            AuthoritativeSnapshot { current_idx: 1, ..base.clone() },
            AuthoritativeSnapshot { shuffle: true, ..base.clone() },
            AuthoritativeSnapshot { repeat: true, ..base.clone() },
            AuthoritativeSnapshot { volume: 51, ..base.clone() },
            AuthoritativeSnapshot { tracks: vec![track("one")], ..base.clone() },
        ];
        for candidate in variants {
            let mut r = StateReconciler::default();
            r.accept(base.clone(), Origin::Poll);
            assert!(
                matches!(r.accept(candidate.clone(), Origin::Poll), Acceptance::Accepted(_)),
                "{candidate:?}"
            );
        }
    }

    #[test]
    fn commands_bypass_suppression() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(10.0, true), Origin::Poll);
        assert!(matches!(r.accept(snapshot(10.1, true), Origin::Command), Acceptance::Accepted(_)));
        assert_eq!(r.displayed().unwrap().position, Some(10.1));
    }

    #[test]
    fn accepting_twice_is_idempotent() {
        for origin in [Origin::Poll, Origin::Command] {
            let mut r = StateReconciler::default();
            r.accept(snapshot(30.0, true), origin);
            let (first, first_clock) = (r.displayed().cloned(), r.clock().raw());
            r.accept(snapshot(30.0, true), origin);
            assert_eq!(r.displayed().cloned(), first);
            assert_eq!(r.clock().raw(), first_clock);
        }
    }

    #[test]
    fn acceptance_reseeds_clock_and_reports_track_change() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(10.0, true), Origin::Poll);
        r.tick();
        let next = AuthoritativeSnapshot { current_idx: 1, ..snapshot(0.0, true) };
        let acceptance = r.accept(next, Origin::Command);
        assert_eq!(
            acceptance,
            Acceptance::Accepted(SnapshotChange { track_changed: true, playback_changed: false })
        );
        assert_eq!(r.clock().raw(), 0.0);
        assert_eq!(r.current_track_key().unwrap().name, "two");
    }

    #[test]
    fn aborted_seek_restores_displayed_position() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(42.0, false), Origin::Poll);
        r.begin_seek(90.0);
        assert_eq!(r.clock().raw(), 90.0);
        r.abort_seek();
        assert_eq!(r.clock().raw(), 42.0);
    }

    #[test]
    fn positionless_snapshots_never_reset_the_clock() {
        let json = r#"{"tracks": [{"name": "one", "artist": "A", "duration": "3:00"}],
            "current_idx": 0, "is_playing": true, "volume": 50, "shuffle": false, "repeat": false}"#;
        let poll = |volume: u8, playing: bool| {
            let snap: AuthoritativeSnapshot = serde_json::from_str(json).unwrap();
            AuthoritativeSnapshot { volume, is_playing: playing, ..snap.normalize() }
        };

        let mut r = StateReconciler::default();
        r.accept(poll(50, true), Origin::Poll);
        for _ in 0..200 {
            r.tick();
        }
        assert!((r.clock().raw() - 10.0).abs() < 1e-6);

        // A gesture changed the volume; the poll is accepted but has no position.
        assert!(matches!(r.accept(poll(80, true), Origin::Poll), Acceptance::Accepted(_)));
        assert!((r.clock().raw() - 10.0).abs() < 1e-6);

        // Pause via a partial reply, then the next poll while paused.
        let paused = crate::backend::commands::PartialUpdate { is_playing: Some(false), ..Default::default() }
            .apply_to(r.displayed().unwrap());
        r.accept(paused, Origin::Command);
        assert!(!r.is_playing());
        assert_eq!(r.accept(poll(80, false), Origin::Poll), Acceptance::Rejected);
        assert!((r.clock().raw() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn partial_reply_keeps_last_reported_position() {
        let mut r = StateReconciler::default();
        r.accept(snapshot(10.0, true), Origin::Poll);
        for _ in 0..10 {
            r.tick();
        }
        let paused = AuthoritativeSnapshot { is_playing: false, position: None, ..snapshot(0.0, true) };
        r.accept(paused, Origin::Command);
        assert_eq!(r.displayed().unwrap().position, Some(10.0));
        assert!((r.clock().raw() - 10.5).abs() < 1e-9);
        // The backend still reports 10.0: within tolerance of the last report.
        assert_eq!(r.accept(snapshot(10.0, false), Origin::Poll), Acceptance::Rejected);
    }

    fn key(name: &str) -> TrackKey {
        TrackKey { index: 0, name: name.into(), artist: "A".into() }
    }

    #[test]
    fn late_lyrics_for_old_track_are_dropped() {
        let mut lyrics = LyricState::default();
        lyrics.begin_loading(key("old"));
        lyrics.begin_loading(key("new"));
        assert!(!lyrics.apply_result(&key("old"), LyricsResult::NotFound));
        assert_eq!(lyrics.view, LyricsView::Loading);
        assert!(lyrics.apply_result(&key("new"), LyricsResult::NotFound));
        assert_eq!(lyrics.view, LyricsView::NotFound);
    }

    #[test]
    fn focus_index_tracks_clock() {
        let mut lyrics = LyricState::default();
        lyrics.begin_loading(key("t"));
        let found = LyricsResult::Found {
            document: parse_lrc("[00:12.50]Hello\n[00:05]World\nIntro line\n"),
            confidence: 1.0,
            stage: MatchStage::Exact,
        };
        assert!(lyrics.apply_result(&key("t"), found));
        assert_eq!(lyrics.get_index(4.0), Some(0));
        assert_eq!(lyrics.get_index(5.0), Some(1));
        assert_eq!(lyrics.get_index(13.0), Some(2));

        assert!(lyrics.update_index(4.0));
        assert!(!lyrics.update_index(4.9));
        assert!(lyrics.update_index(5.0));
    }

    #[test]
    fn plain_documents_have_no_focus() {
        let mut lyrics = LyricState::default();
        lyrics.begin_loading(key("t"));
        let found = LyricsResult::Found {
            document: crate::lyrics::parse::parse_plain("a\nb"),
            confidence: 0.5,
            stage: MatchStage::Combined,
        };
        lyrics.apply_result(&key("t"), found);
        assert_eq!(lyrics.get_index(100.0), None);
    }
}
