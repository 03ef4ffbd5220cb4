mod backend;
mod event;
mod gesture;
mod lyrics;
mod pool;
mod state;
mod timer;
mod ui;

use crate::backend::BackendClient;
use crate::gesture::GestureClient;
use crate::lyrics::{LrclibClient, LyricsFetcher};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEFAULT_BACKEND: &str = "http://localhost:8000/api";

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Base URL of the playback backend. Falls back to PALMSYNC_BACKEND.
    #[arg(long)]
    backend: Option<String>,
    /// Base URL of the lyrics catalog. Falls back to PALMSYNC_LYRICS_API.
    #[arg(long = "lyrics-api")]
    lyrics_api: Option<String>,
    /// Do not fetch lyrics
    #[arg(long = "no-lyrics")]
    no_lyrics: bool,
    /// Load this folder into the backend library before starting
    #[arg(long = "load-folder", value_name = "DIR")]
    load_folder: Option<String>,
    /// Replay JPEG frames from this directory through the gesture recognizer
    #[arg(long = "gesture-frames", value_name = "DIR")]
    gesture_frames: Option<PathBuf>,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
}

fn urls_from_env_if_empty(cli: &mut Config) {
    let from_env = |key: &str| {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    if cli.backend.is_none() {
        cli.backend = from_env("PALMSYNC_BACKEND");
    }
    if cli.lyrics_api.is_none() {
        cli.lyrics_api = from_env("PALMSYNC_LYRICS_API");
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "palmsync=debug" } else { "palmsync=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    urls_from_env_if_empty(&mut cfg);
    init_logging(cfg.debug_log);

    let backend_url = cfg.backend.clone().unwrap_or_else(|| DEFAULT_BACKEND.to_string());
    let backend = Arc::new(BackendClient::new(backend_url.as_str()));

    if let Some(folder) = &cfg.load_folder {
        let count = backend.load_folder(folder).await?;
        tracing::info!(count, folder = %folder, "library loaded");
    }

    let fetcher = (!cfg.no_lyrics).then(|| {
        let catalog = match &cfg.lyrics_api {
            Some(url) => LrclibClient::new(url.as_str()),
            None => LrclibClient::default(),
        };
        Arc::new(LyricsFetcher::new(catalog))
    });

    let covers = BackendClient::clone(&backend);
    let (handle, updates, player) = pool::spawn(backend, fetcher, !cfg.no_lyrics);

    if let Some(dir) = cfg.gesture_frames.clone() {
        let (frame_tx, frame_rx) = mpsc::channel(4);
        tokio::spawn(gesture::forward_frames(handle.clone(), GestureClient::new(&backend_url), frame_rx));
        tokio::spawn(async move {
            if let Err(e) = gesture::replay_frames(&dir, frame_tx).await {
                tracing::warn!(error = %e, "gesture frame replay stopped");
            }
        });
    }

    tokio::spawn(ui::controls::read_controls(
        handle.clone(),
        BufReader::new(tokio::io::stdin()),
    ));

    tokio::select! {
        _ = ui::pipe::display_lyrics_pipe(updates, Some(covers)) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            handle.shutdown().await;
        }
    }
    player.await?;
    Ok(())
}
