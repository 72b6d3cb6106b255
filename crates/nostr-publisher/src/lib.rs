//! Publishes signed web bookmark events (NIP-B0, kind 39701) to Nostr relays
//! and records the outcome per relay in the publication ledger.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       NOSTR-PUBLISHER                            │
//! │                                                                  │
//! │  PublishQueue ──► PublicationOrchestrator ──► RelayPublisher     │
//! │  (mpsc worker)    (kind/bookmark checks,      (concurrent fan-out,│
//! │                    retry with backoff)         connection cache)  │
//! │                                                   │        │      │
//! │                                                   ▼        ▼      │
//! │                                            Nostr relays  SQLite   │
//! │                                                        (ledger)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A publication attempt fails as a whole only when relays were tried and
//! none accepted the event ([`PublishError::TotalFailure`]); that is the only
//! error [`PublicationOrchestrator::publish_with_retry`] retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nostr_publisher::{
//!     NostrRelayConnector, PublicationOrchestrator, PublisherConfig, RelayPublisher, RetryPolicy,
//! };
//!
//! let config = PublisherConfig::from_env()?;
//! let connector = Arc::new(NostrRelayConnector::new(config.timeout));
//! let publisher = RelayPublisher::new(db, connector, config);
//! let orchestrator = PublicationOrchestrator::new(publisher, RetryPolicy::from_env()?);
//!
//! orchestrator.publish_with_retry(&event, bookmark.id).await?;
//! ```
//!
//! # Environment
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `NOSTR_RELAYS` | required | Comma or whitespace separated relay URLs |
//! | `NOSTR_PUBLISH_TIMEOUT_SECS` | 10 | Per-relay connect and send timeout |
//! | `NOSTR_PUBLISH_MAX_ATTEMPTS` | 3 | Total publication attempts |

mod config;
mod connection;
mod error;
mod orchestrator;
mod publish;
mod queue;
pub mod verify;

#[cfg(test)]
mod testing;

pub use config::{PublisherConfig, RetryPolicy};
pub use connection::{NostrRelayConnector, RelayConnection, RelayConnector};
pub use error::{Error, PublishError};
pub use orchestrator::{PublicationOrchestrator, PublishReport, SkipReason};
pub use publish::{Outcome, RelayPublisher, CONNECT_FAILURE_MESSAGE};
pub use queue::{PublishJob, PublishQueue};
pub use verify::verify_signature;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
