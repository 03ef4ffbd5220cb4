//! Client for the backend's hand-gesture recognizer.
//!
//! Frames are posted as JPEG images to `detect-gesture`. The backend applies
//! a recognized gesture itself, so the only client-side reaction is an
//! immediate state refresh.

use crate::event::PlayerHandle;
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// At most one frame per this period reaches the recognizer.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(200);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("palmsync/0.1")
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build HTTP client")
});

#[derive(thiserror::Error, Debug)]
pub enum GestureError {
    #[error("Gesture request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Gesture service error: {0}")]
    Service(String),
    #[error("Malformed gesture response: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cannot read frame: {0}")]
    Io(#[from] std::io::Error),
}

/// A gesture the backend recognized and already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Toggle,
    Shuffle(Option<bool>),
    Repeat(Option<bool>),
    Volume(u8),
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    gesture: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl DetectResponse {
    fn into_event(self) -> Result<Option<GestureEvent>, GestureError> {
        let Some(name) = self.gesture else {
            return match self.error {
                Some(e) => Err(GestureError::Service(e)),
                None => Ok(None),
            };
        };
        let event = match name.as_str() {
            "toggle" => GestureEvent::Toggle,
            "shuffle" => GestureEvent::Shuffle(self.value.as_ref().and_then(Value::as_bool)),
            "repeat" => GestureEvent::Repeat(self.value.as_ref().and_then(Value::as_bool)),
            "volume" => {
                let v = self.value.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
                GestureEvent::Volume(v.round().clamp(0.0, 100.0) as u8)
            }
            other => {
                tracing::debug!(gesture = other, "ignoring unknown gesture");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }
}

/// Recognizer seam; `Ok(None)` means no hand or no gesture in the frame.
pub trait GestureDetector: Send + Sync {
    fn detect(&self, frame: Vec<u8>) -> impl Future<Output = Result<Option<GestureEvent>, GestureError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GestureClient {
    endpoint: String,
}

impl GestureClient {
    pub fn new(backend_url: &str) -> Self {
        Self { endpoint: format!("{}/detect-gesture", backend_url.trim_end_matches('/')) }
    }
}

impl GestureDetector for GestureClient {
    async fn detect(&self, frame: Vec<u8>) -> Result<Option<GestureEvent>, GestureError> {
        let part = Part::bytes(frame).file_name("frame.jpg").mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);
        let resp = HTTP_CLIENT.post(&self.endpoint).multipart(form).send().await?;
        let body = resp.error_for_status()?.text().await?;
        serde_json::from_str::<DetectResponse>(&body)?.into_event()
    }
}

/// Drops frames that arrive sooner than `FRAME_INTERVAL` after the last
/// accepted one.
#[derive(Debug, Default)]
pub struct GestureThrottle {
    last: Option<Instant>,
}

impl GestureThrottle {
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < FRAME_INTERVAL => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Send frames to the recognizer until the frame channel closes, asking
/// the player for a refresh after every recognized gesture.
pub async fn forward_frames<D: GestureDetector>(
    handle: PlayerHandle,
    detector: D,
    mut frames: mpsc::Receiver<Vec<u8>>,
) {
    let mut throttle = GestureThrottle::default();
    while let Some(frame) = frames.recv().await {
        if !throttle.admit(Instant::now()) {
            continue;
        }
        match detector.detect(frame).await {
            Ok(Some(gesture)) => {
                tracing::info!(?gesture, "gesture detected");
                if !handle.refresh().await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "gesture detection failed"),
        }
    }
}

/// Feed the `.jpg`/`.jpeg` files of `dir`, in name order, into `tx` at the
/// recognizer's frame rate.
pub async fn replay_frames(dir: &Path, tx: mpsc::Sender<Vec<u8>>) -> Result<(), GestureError> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
        if is_jpeg {
            paths.push(path);
        }
    }
    paths.sort();
    tracing::info!(count = paths.len(), dir = %dir.display(), "replaying gesture frames");

    let mut pace = tokio::time::interval(FRAME_INTERVAL);
    for path in paths {
        pace.tick().await;
        let frame = tokio::fs::read(&path).await?;
        if tx.send(frame).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Request;
    use std::sync::Mutex;

    fn parse(json: &str) -> Result<Option<GestureEvent>, GestureError> {
        serde_json::from_str::<DetectResponse>(json).unwrap().into_event()
    }

    #[test]
    fn parses_detect_responses() {
        assert_eq!(parse(r#"{"gesture":"toggle","action":"play/pause"}"#).unwrap(), Some(GestureEvent::Toggle));
        assert_eq!(
            parse(r#"{"gesture":"shuffle","value":true}"#).unwrap(),
            Some(GestureEvent::Shuffle(Some(true)))
        );
        assert_eq!(parse(r#"{"gesture":"volume","value":72}"#).unwrap(), Some(GestureEvent::Volume(72)));
        assert_eq!(parse(r#"{"gesture":null}"#).unwrap(), None);
        assert_eq!(parse(r#"{"gesture":"wave"}"#).unwrap(), None);
    }

    #[test]
    fn service_error_without_gesture() {
        let err = parse(r#"{"gesture":null,"error":"Hand detector not initialized"}"#).unwrap_err();
        assert!(matches!(err, GestureError::Service(_)));
    }

    #[test]
    fn endpoint_is_joined() {
        let client = GestureClient::new("http://localhost:8000/api/");
        assert_eq!(client.endpoint, "http://localhost:8000/api/detect-gesture");
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_admits_five_per_second() {
        let mut throttle = GestureThrottle::default();
        let start = Instant::now();
        let admitted = (0..20)
            .filter(|i| throttle.admit(start + Duration::from_millis(50 * i)))
            .count();
        assert_eq!(admitted, 5);
    }

    struct StubDetector {
        seen: Mutex<Vec<u8>>,
    }

    impl GestureDetector for StubDetector {
        async fn detect(&self, frame: Vec<u8>) -> Result<Option<GestureEvent>, GestureError> {
            self.seen.lock().unwrap().push(frame[0]);
            Ok((frame[0] == 1).then_some(GestureEvent::Toggle))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn detected_gesture_requests_refresh() {
        let (req_tx, mut req_rx) = mpsc::channel(8);
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let detector = StubDetector { seen: Mutex::new(Vec::new()) };
        let task = tokio::spawn(forward_frames(PlayerHandle::new(req_tx), detector, frame_rx));

        frame_tx.send(vec![0]).await.unwrap();
        tokio::time::sleep(FRAME_INTERVAL).await;
        frame_tx.send(vec![1]).await.unwrap();
        // Too soon after the previous frame.
        frame_tx.send(vec![1]).await.unwrap();
        drop(frame_tx);
        task.await.unwrap();

        assert!(matches!(req_rx.recv().await, Some(Request::Refresh)));
        assert!(req_rx.try_recv().is_err());
    }
}
