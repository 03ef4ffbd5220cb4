// pool.rs: the player task. Owns all displayed state; polls, ticks and
// lyrics fetches report back to it over channels.

use crate::backend::{Command, PlayerBackend};
use crate::event::{
    Event, FollowUp, PlayerHandle, Request, handle_command_done, handle_lyrics_result,
    handle_poll_result,
};
use crate::lyrics::{LyricsCatalog, LyricsFetcher, LyricsQuery};
use crate::state::{StateBundle, Update};
use crate::timer::TICK_INTERVAL;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Start the player task. Returns the handle front ends use to issue
/// requests and the stream of updates they render.
pub fn spawn<B, C>(
    backend: Arc<B>,
    fetcher: Option<Arc<LyricsFetcher<C>>>,
    lyrics_panel_open: bool,
) -> (PlayerHandle, mpsc::Receiver<Update>, JoinHandle<()>)
where
    B: PlayerBackend + 'static,
    C: LyricsCatalog + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(32);
    let (update_tx, update_rx) = mpsc::channel(32);
    let task = tokio::spawn(listen(backend, fetcher, request_rx, update_tx, lyrics_panel_open));
    (PlayerHandle::new(request_tx), update_rx, task)
}

struct Player<B, C> {
    backend: Arc<B>,
    fetcher: Option<Arc<LyricsFetcher<C>>>,
    event_tx: mpsc::Sender<Event>,
    state: StateBundle,
    ticker: Option<Interval>,
    lyrics_task: Option<JoinHandle<()>>,
    poll_in_flight: bool,
    /// Bumped on every applied command reply. Polls started before the
    /// latest one may carry pre-command state and are dropped.
    generation: u64,
}

impl<B, C> Player<B, C>
where
    B: PlayerBackend + 'static,
    C: LyricsCatalog + 'static,
{
    fn spawn_poll(&mut self) {
        if self.poll_in_flight {
            return;
        }
        self.poll_in_flight = true;
        let generation = self.generation;
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch_state().await;
            let _ = tx.send(Event::Polled { generation, result }).await;
        });
    }

    fn spawn_command(&mut self, command: Command) {
        if let Command::Seek(target) = command {
            self.state.reconciler.begin_seek(target);
            self.state.version += 1;
        }
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = backend.send(&command).await;
            let _ = tx.send(Event::CommandDone { command, result }).await;
        });
    }

    /// Start, restart or drop the lyrics fetch so it matches the current
    /// track and panel state. `force` refetches even for the same track.
    fn sync_lyrics(&mut self, force: bool) {
        let wanted = match (&self.fetcher, self.state.panel_open) {
            (Some(_), true) => self.state.reconciler.current_track_key(),
            _ => None,
        };
        if !force && wanted.as_ref() == self.state.lyric_state.key() {
            return;
        }
        if let Some(task) = self.lyrics_task.take() {
            task.abort();
        }
        self.state.version += 1;

        let (Some(key), Some(fetcher), Some(track)) = (
            wanted,
            self.fetcher.clone(),
            self.state
                .reconciler
                .displayed()
                .and_then(|d| d.current_track().cloned()),
        ) else {
            self.state.lyric_state.clear();
            return;
        };

        self.state.lyric_state.begin_loading(key.clone());
        let query = LyricsQuery::from_track(&track);
        tracing::debug!(?query, "fetching lyrics");
        let tx = self.event_tx.clone();
        self.lyrics_task = Some(tokio::spawn(async move {
            let result = fetcher.fetch(&query).await;
            let _ = tx.send(Event::Lyrics { key, result }).await;
        }));
    }

    /// Create the tick timer while playing; drop it while paused so no
    /// wakeups are scheduled at all.
    fn sync_ticker(&mut self) {
        match (self.state.reconciler.is_playing(), self.ticker.is_some()) {
            (true, false) => {
                let mut ticker =
                    tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
            }
            (false, true) => self.ticker = None,
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        let follow = match event {
            Event::Polled { generation, result } => {
                self.poll_in_flight = false;
                if generation < self.generation {
                    tracing::debug!("dropping poll started before the last command reply");
                    FollowUp { poll_now: true }
                } else {
                    handle_poll_result(&mut self.state, result)
                }
            }
            Event::CommandDone { command, result } => {
                if result.is_ok() {
                    self.generation += 1;
                }
                handle_command_done(&mut self.state, command, result)
            }
            Event::Lyrics { key, result } => {
                handle_lyrics_result(&mut self.state, key, result);
                FollowUp::default()
            }
        };
        if follow.poll_now {
            self.spawn_poll();
        }
    }

    /// Returns false when the loop should stop.
    fn handle_request(&mut self, request: Option<Request>) -> bool {
        match request {
            None | Some(Request::Shutdown) => return false,
            Some(Request::Command(command)) => self.spawn_command(command),
            Some(Request::SetLyricsPanel(open)) => {
                self.state.panel_open = open;
            }
            Some(Request::RetryLyrics) => self.sync_lyrics(true),
            Some(Request::Refresh) => self.spawn_poll(),
        }
        true
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Player task main loop.
pub async fn listen<B, C>(
    backend: Arc<B>,
    fetcher: Option<Arc<LyricsFetcher<C>>>,
    mut requests: mpsc::Receiver<Request>,
    update_tx: mpsc::Sender<Update>,
    lyrics_panel_open: bool,
) where
    B: PlayerBackend + 'static,
    C: LyricsCatalog + 'static,
{
    let (event_tx, mut event_rx) = mpsc::channel(32);
    let mut player = Player {
        backend,
        fetcher,
        event_tx,
        state: StateBundle::new(lyrics_panel_open),
        ticker: None,
        lyrics_task: None,
        poll_in_flight: false,
        generation: 0,
    };
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_sent: Option<u64> = None;

    loop {
        let mut line_moved = false;
        tokio::select! {
            _ = poll.tick() => player.spawn_poll(),
            Some(event) = event_rx.recv() => player.handle_event(event),
            request = requests.recv() => {
                if !player.handle_request(request) {
                    break;
                }
            }
            _ = next_tick(&mut player.ticker) => {
                line_moved = player.state.tick();
            }
        }

        player.sync_ticker();
        player.sync_lyrics(false);
        line_moved |= player.state.update_index();

        if last_sent != Some(player.state.version) {
            let update = player.state.to_update(line_moved);
            if update_tx.send(update).await.is_err() {
                break;
            }
            last_sent = Some(player.state.version);
            player.state.notice = None;
        }
    }

    if let Some(task) = player.lyrics_task.take() {
        task.abort();
    }
    tracing::info!("player task stopped");
}
