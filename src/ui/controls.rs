//! Line-based remote control read from stdin alongside pipe output.
//!
//! One command per line: `toggle`, `next`, `prev`, `play N`, `seek SECS`,
//! `vol N`, `shuffle`, `repeat`, `delete N`, `lyrics on|off`, `retry`,
//! `refresh`, `quit`.

use crate::backend::Command;
use crate::event::{PlayerHandle, Request};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub fn parse_control(line: &str) -> Option<Request> {
    let mut words = line.split_whitespace();
    let verb = words.next()?.to_ascii_lowercase();
    let arg = words.next();
    let request = match (verb.as_str(), arg) {
        ("toggle" | "p", None) => Request::Command(Command::Toggle),
        ("next" | "n", None) => Request::Command(Command::Next),
        ("prev" | "b", None) => Request::Command(Command::Prev),
        ("shuffle", None) => Request::Command(Command::Shuffle),
        ("repeat", None) => Request::Command(Command::Repeat),
        ("play", Some(n)) => Request::Command(Command::Play(n.parse().ok()?)),
        ("delete", Some(n)) => Request::Command(Command::DeleteTrack(n.parse().ok()?)),
        ("seek", Some(s)) => Request::Command(Command::seek(s.parse().ok()?)),
        ("vol" | "volume", Some(v)) => Request::Command(Command::volume(v.parse().ok()?)),
        ("lyrics", Some("on")) => Request::SetLyricsPanel(true),
        ("lyrics", Some("off")) => Request::SetLyricsPanel(false),
        ("retry", None) => Request::RetryLyrics,
        ("refresh", None) => Request::Refresh,
        ("quit" | "q", None) => Request::Shutdown,
        _ => return None,
    };
    Some(request)
}

/// Forward commands from `input` until it ends or the player stops.
pub async fn read_controls<R: AsyncBufRead + Unpin>(handle: PlayerHandle, input: R) {
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read controls");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let Some(request) = parse_control(&line) else {
            eprintln!("unknown command: {}", line.trim());
            continue;
        };
        let delivered = match request {
            Request::Command(command) => handle.command(command).await,
            Request::SetLyricsPanel(open) => handle.show_lyrics(open).await,
            Request::RetryLyrics => handle.retry_lyrics().await,
            Request::Refresh => handle.refresh().await,
            Request::Shutdown => handle.shutdown().await,
        };
        if !delivered {
            break;
        }
    }
}
