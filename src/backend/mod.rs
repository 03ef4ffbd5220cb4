//! Backend module: the remote player that owns playback.

pub mod commands;
pub mod connection;
pub mod snapshot;

use std::future::Future;

pub use commands::{Command, CommandOutcome};
pub use connection::{BackendClient, BackendError};
pub use snapshot::{AuthoritativeSnapshot, Track, TrackKey};

/// State and command surface of the playback backend.
pub trait PlayerBackend: Send + Sync {
    fn fetch_state(&self) -> impl Future<Output = Result<AuthoritativeSnapshot, BackendError>> + Send;

    fn send(&self, command: &Command) -> impl Future<Output = Result<CommandOutcome, BackendError>> + Send;
}
