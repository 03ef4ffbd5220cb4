//! HTTP client for the playback backend.

use crate::backend::commands::{Command, CommandOutcome, CommandResponse};
use crate::backend::snapshot::AuthoritativeSnapshot;
use crate::backend::PlayerBackend;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(5000);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("palmsync/0.1")
        .timeout(TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
});

/// Errors that can occur talking to the backend
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend rejected command: {0}")]
    Command(String),
    #[error("Malformed backend response: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct LoadFolderResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Stable, cacheable artwork URL for a library index.
    pub fn cover_url(&self, idx: usize) -> String {
        self.url(&format!("cover/{idx}"))
    }

    /// Ask the backend to replace its library with the audio files in `folder`.
    /// Returns the number of tracks loaded.
    pub async fn load_folder(&self, folder: &str) -> Result<usize, BackendError> {
        let resp = HTTP_CLIENT
            .post(self.url("load-folder"))
            .json(&serde_json::json!({ "folder": folder }))
            .send()
            .await?;
        let body = resp.text().await?;
        let reply: LoadFolderResponse = serde_json::from_str(&body)?;
        if reply.success {
            Ok(reply.count)
        } else {
            Err(BackendError::Command(
                reply.error.unwrap_or_else(|| "failed to load folder".to_string()),
            ))
        }
    }
}

impl PlayerBackend for BackendClient {
    async fn fetch_state(&self) -> Result<AuthoritativeSnapshot, BackendError> {
        let resp = HTTP_CLIENT.get(self.url("state")).send().await?.error_for_status()?;
        let body = resp.text().await?;
        let snapshot: AuthoritativeSnapshot = serde_json::from_str(&body)?;
        Ok(snapshot.normalize())
    }

    async fn send(&self, command: &Command) -> Result<CommandOutcome, BackendError> {
        let resp = HTTP_CLIENT
            .request(command.method(), self.url(&command.path()))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(BackendError::Command(format!(
                "{} {}: HTTP {}",
                command.method(),
                command.path(),
                resp.status()
            )));
        }
        let body = resp.text().await?;
        serde_json::from_str::<CommandResponse>(&body)?.into_outcome()
    }
}
