use crate::backend::{BackendClient, TrackKey};
use crate::state::{LyricsView, Update};
use crate::ui::util::{format_time, track_id};
use tokio::sync::mpsc;

/// Turns the update stream into printable lines: a header per track, the
/// active lyric line whenever it moves, and lyric lookup outcomes.
#[derive(Debug, Default)]
pub struct PipeState {
    /// Source of cover-art links for track headers.
    covers: Option<BackendClient>,
    last_track_id: Option<TrackKey>,
    last_line_idx: Option<usize>,
    last_view: Option<LyricsView>,
}

impl PipeState {
    pub fn new(covers: Option<BackendClient>) -> Self {
        Self { covers, ..Default::default() }
    }

    pub fn render(&mut self, upd: &Update) -> Vec<String> {
        let mut out = Vec::new();
        let track = track_id(upd);

        if track != self.last_track_id {
            // Blank line between tracks, only after something was printed.
            if self.last_track_id.is_some() {
                out.push(String::new());
            }
            if let Some(t) = upd.snapshot.as_ref().and_then(|s| s.current_track()) {
                let duration = t.duration_secs().map(format_time).unwrap_or_else(|| "-:--".into());
                out.push(format!("# {} - {} ({})", t.artist, t.name, duration));
                if let Some(covers) = &self.covers {
                    out.push(format!("# cover {}", covers.cover_url(t.index)));
                }
            }
            self.last_track_id = track;
            self.last_line_idx = None;
            self.last_view = None;
        }

        if self.last_view.as_ref() != Some(&upd.lyrics) {
            match &upd.lyrics {
                LyricsView::NotFound => out.push("# no lyrics found".into()),
                LyricsView::Failed(e) => out.push(format!("# lyrics unavailable: {e}")),
                LyricsView::Ready { document, stage, .. } if !document.is_synced() => {
                    out.push(format!("# unsynced lyrics ({stage})"));
                    out.extend(document.lines.iter().map(|l| l.text.clone()));
                }
                _ => {}
            }
            self.last_view = Some(upd.lyrics.clone());
        }

        if let LyricsView::Ready { document, .. } = &upd.lyrics
            && upd.index != self.last_line_idx
        {
            if let Some(line) = upd.index.and_then(|idx| document.lines.get(idx)) {
                out.push(line.text.clone());
            }
            self.last_line_idx = upd.index;
        }
        out
    }
}

/// Display lyrics in pipe mode (stdout only, for scripting). Returns when
/// the player task stops.
pub async fn display_lyrics_pipe(mut rx: mpsc::Receiver<Update>, covers: Option<BackendClient>) {
    let mut state = PipeState::new(covers);
    while let Some(upd) = rx.recv().await {
        if let Some(notice) = &upd.notice {
            eprintln!("{notice}");
        }
        for line in state.render(&upd) {
            println!("{line}");
        }
    }
}
