use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use bookmark_core::SignedEvent;
use database::{publication, relay, Database};
use futures::future::join_all;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::PublisherConfig;
use crate::connection::{RelayConnection, RelayConnector};
use crate::Error;

/// Recorded for relays that could not be reached.
pub const CONNECT_FAILURE_MESSAGE: &str = "Could not connect to relay";

type ConnectionCell = Arc<OnceCell<Arc<dyn RelayConnection>>>;

/// Result of delivering an event to one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Fans signed events out to relays and records every outcome in the
/// publication ledger.
///
/// Connections are cached per relay address until [`RelayPublisher::close_all`].
pub struct RelayPublisher {
    db: Database,
    connector: Arc<dyn RelayConnector>,
    config: PublisherConfig,
    connections: Mutex<HashMap<String, ConnectionCell>>,
}

impl RelayPublisher {
    pub fn new(db: Database, connector: Arc<dyn RelayConnector>, config: PublisherConfig) -> Self {
        Self {
            db,
            connector,
            config,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publish to the configured relays.
    pub async fn publish_configured(
        &self,
        event: &SignedEvent,
        bookmark_id: i64,
    ) -> BTreeMap<String, Outcome> {
        self.publish(event, bookmark_id, &self.config.relays).await
    }

    /// Send `event` to every endpoint concurrently and wait for all of them.
    ///
    /// Per-relay failures never surface as errors: they are returned in the
    /// map and written to the ledger. Duplicate endpoints are sent to once.
    pub async fn publish(
        &self,
        event: &SignedEvent,
        bookmark_id: i64,
        endpoints: &[String],
    ) -> BTreeMap<String, Outcome> {
        let endpoints: BTreeSet<&str> = endpoints.iter().map(String::as_str).collect();

        let tasks = endpoints.into_iter().map(|address| async move {
            let outcome = self.publish_to(event, bookmark_id, address).await;
            (address.to_string(), outcome)
        });
        let results: BTreeMap<String, Outcome> = join_all(tasks).await.into_iter().collect();

        let succeeded = results.values().filter(|outcome| outcome.success).count();
        info!(
            event_id = %event.id,
            bookmark_id,
            succeeded,
            failed = results.len() - succeeded,
            "Published bookmark event"
        );
        results
    }

    async fn publish_to(&self, event: &SignedEvent, bookmark_id: i64, address: &str) -> Outcome {
        let relay_id = match relay::find_or_create_relay(self.db.pool(), address).await {
            Ok(relay) => Some(relay.id),
            Err(err) => {
                warn!(relay = %address, error = %err, "Failed to register relay");
                None
            }
        };

        let outcome = match self.connection(address).await {
            Ok(connection) => {
                if let Some(relay_id) = relay_id {
                    if let Err(err) = relay::mark_connected(self.db.pool(), relay_id).await {
                        warn!(relay = %address, error = %err, "Failed to record relay connection");
                    }
                }
                self.send(connection.as_ref(), event).await
            }
            Err(err) => {
                warn!(relay = %address, error = %err, "Could not connect to relay");
                Outcome::failure(CONNECT_FAILURE_MESSAGE)
            }
        };

        if let Some(relay_id) = relay_id {
            if let Err(err) = publication::record_outcome(
                self.db.pool(),
                bookmark_id,
                relay_id,
                outcome.success,
                outcome.message.as_deref(),
            )
            .await
            {
                warn!(relay = %address, bookmark_id, error = %err, "Failed to record publication");
            }
        }

        outcome
    }

    async fn send(&self, connection: &dyn RelayConnection, event: &SignedEvent) -> Outcome {
        let sent = tokio::time::timeout(self.config.timeout, connection.send_event(event))
            .await
            .map_err(|_| Error::Timeout)
            .and_then(|result| result);

        match sent {
            Ok(()) => {
                debug!(relay = %connection.address(), event_id = %event.id, "Relay accepted event");
                Outcome::success()
            }
            Err(Error::Rejected(message)) => {
                warn!(relay = %connection.address(), %message, "Relay rejected event");
                Outcome::failure(message)
            }
            Err(err) => {
                warn!(relay = %connection.address(), error = %err, "Failed to send event");
                Outcome::failure(err.to_string())
            }
        }
    }

    /// Cached connection for `address`, opening one if needed.
    ///
    /// The map lock covers lookup and insert only; opening happens in the
    /// per-address cell, so a slow relay never blocks the others.
    async fn connection(&self, address: &str) -> Result<Arc<dyn RelayConnection>, Error> {
        let cell = {
            let mut connections = self.connections.lock().map_err(|_| Error::MutexPoisoned)?;
            connections.entry(address.to_string()).or_default().clone()
        };

        let connection = cell.get_or_try_init(|| self.open(address)).await?;
        Ok(connection.clone())
    }

    async fn open(&self, address: &str) -> Result<Arc<dyn RelayConnection>, Error> {
        let connection = tokio::time::timeout(self.config.timeout, self.connector.connect(address))
            .await
            .map_err(|_| Error::Timeout)??;
        debug!(relay = %address, "Opened relay connection");
        Ok(connection)
    }

    /// Close and forget every cached connection.
    pub async fn close_all(&self) {
        let cells = {
            let mut connections = self
                .connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *connections)
        };

        let open: Vec<Arc<dyn RelayConnection>> = cells
            .into_values()
            .filter_map(|cell| cell.get().cloned())
            .collect();
        let closed = open.len();
        join_all(open.iter().map(|connection| connection.close())).await;

        if closed > 0 {
            debug!(closed, "Closed relay connections");
        }
    }
}
