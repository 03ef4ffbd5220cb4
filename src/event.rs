use crate::backend::{
    AuthoritativeSnapshot, BackendError, Command, CommandOutcome, TrackKey,
};
use crate::lyrics::LyricsResult;
use crate::state::{Acceptance, Origin, StateBundle};
use tokio::sync::mpsc;

/// Messages from front ends to the player task.
#[derive(Debug)]
pub enum Request {
    Command(Command),
    SetLyricsPanel(bool),
    RetryLyrics,
    /// Poll right away instead of waiting for the next period.
    Refresh,
    Shutdown,
}

/// Results delivered back to the player task by its workers.
#[derive(Debug)]
pub enum Event {
    /// `generation` is the number of command replies applied when the poll
    /// was started.
    Polled {
        generation: u64,
        result: Result<AuthoritativeSnapshot, BackendError>,
    },
    CommandDone {
        command: Command,
        result: Result<CommandOutcome, BackendError>,
    },
    Lyrics {
        key: TrackKey,
        result: LyricsResult,
    },
}

/// What the loop has to do after an event was applied.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FollowUp {
    pub poll_now: bool,
}

/// Cloneable front-end side of the player task.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<Request>,
}

impl PlayerHandle {
    pub fn new(tx: mpsc::Sender<Request>) -> Self {
        Self { tx }
    }

    /// Returns false once the player task has stopped.
    async fn send(&self, request: Request) -> bool {
        self.tx.send(request).await.is_ok()
    }

    pub async fn command(&self, command: Command) -> bool {
        self.send(Request::Command(command)).await
    }

    pub async fn show_lyrics(&self, open: bool) -> bool {
        self.send(Request::SetLyricsPanel(open)).await
    }

    pub async fn retry_lyrics(&self) -> bool {
        self.send(Request::RetryLyrics).await
    }

    pub async fn refresh(&self) -> bool {
        self.send(Request::Refresh).await
    }

    pub async fn shutdown(&self) -> bool {
        self.send(Request::Shutdown).await
    }
}

pub fn handle_poll_result(
    state: &mut StateBundle,
    result: Result<AuthoritativeSnapshot, BackendError>,
) -> FollowUp {
    match result {
        Ok(snapshot) => {
            if let Acceptance::Accepted(change) = state.accept(snapshot, Origin::Poll) {
                tracing::debug!(?change, "poll snapshot accepted");
            }
        }
        // Stale but consistent: the next poll retries.
        Err(e) => tracing::warn!(error = %e, "state poll failed"),
    }
    FollowUp::default()
}

pub fn handle_command_done(
    state: &mut StateBundle,
    command: Command,
    result: Result<CommandOutcome, BackendError>,
) -> FollowUp {
    match result {
        Ok(CommandOutcome::Snapshot(snapshot)) => {
            state.accept(snapshot, Origin::Command);
        }
        Ok(CommandOutcome::Partial(partial)) => {
            let Some(displayed) = state.reconciler.displayed() else {
                return FollowUp { poll_now: true };
            };
            // No position in the candidate, so the clock keeps interpolating
            // from where it is.
            let candidate = partial.apply_to(displayed);
            state.accept(candidate, Origin::Command);
        }
        Ok(CommandOutcome::Acknowledged) => {
            tracing::debug!(?command, "command acknowledged without state");
            return FollowUp { poll_now: true };
        }
        Err(e) => {
            tracing::warn!(?command, error = %e, "command failed");
            if matches!(command, Command::Seek(_)) {
                state.reconciler.abort_seek();
            }
            state.set_notice(Some(e.to_string()));
        }
    }
    FollowUp::default()
}

/// Store a lyrics result if it still matches the current track.
pub fn handle_lyrics_result(state: &mut StateBundle, key: TrackKey, result: LyricsResult) {
    if state.lyric_state.apply_result(&key, result) {
        state.version += 1;
    } else {
        tracing::debug!(track = %key.name, "discarding lyrics for a track no longer playing");
    }
}
