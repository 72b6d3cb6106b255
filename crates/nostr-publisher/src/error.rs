use bookmark_core::EventError;
use database::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("nostr client error: {0}")]
    NostrClient(#[from] nostr_sdk::client::Error),
    #[error("event error: {0}")]
    Event(#[from] EventError),
    #[error("invalid nostr event: {0}")]
    InvalidEvent(String),
    #[error("signature verification failed: {0}")]
    Signature(String),
    #[error("could not connect to {relay}: {message}")]
    Connect { relay: String, message: String },
    #[error("relay rejected event: {0}")]
    Rejected(String),
    #[error("relay sent no acknowledgement")]
    NoAcknowledgement,
    #[error("missing env var: {0}")]
    MissingEnv(&'static str),
    #[error("invalid config {name}: {message}")]
    InvalidConfig { name: &'static str, message: String },
    #[error("publish queue closed")]
    QueueClosed,
    #[error("mutex poisoned")]
    MutexPoisoned,
    #[error("operation timed out")]
    Timeout,
}

/// Outcome of one orchestrated publication attempt that did not succeed.
///
/// Only [`PublishError::TotalFailure`] is retried; anything else is surfaced
/// as is.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to publish to any of {attempted} relays")]
    TotalFailure { attempted: usize },
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::TotalFailure { .. })
    }
}
