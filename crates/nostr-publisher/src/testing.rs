//! In-process relay doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookmark_core::{event, SignedEvent};
use database::{bookmark, user, Database};

use crate::connection::{RelayConnection, RelayConnector};
use crate::Error;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Accept,
    Reject(&'static str),
    Unreachable,
    /// Connecting never completes.
    HangOnConnect,
    /// Connects, but never answers a sent event.
    HangOnSend,
}

pub struct MockConnection {
    address: String,
    behavior: Behavior,
    pub sent: AtomicUsize,
    pub closed: AtomicBool,
}

#[async_trait]
impl RelayConnection for MockConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_event(&self, _event: &SignedEvent) -> Result<(), Error> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Reject(message) => Err(Error::Rejected(message.to_string())),
            Behavior::HangOnSend => std::future::pending().await,
            _ => Ok(()),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector whose relays behave as configured; unknown addresses accept.
#[derive(Default)]
pub struct MockConnector {
    behaviors: HashMap<String, Behavior>,
    pub connects: AtomicUsize,
    pub opened: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnector {
    pub fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(address, behavior)| (address.to_string(), *behavior))
                .collect(),
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<Arc<MockConnection>> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayConnector for MockConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RelayConnection>, Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .get(address)
            .copied()
            .unwrap_or(Behavior::Accept);

        if let Behavior::HangOnConnect = behavior {
            std::future::pending::<()>().await;
        }

        if let Behavior::Unreachable = behavior {
            return Err(Error::Connect {
                relay: address.to_string(),
                message: "connection refused".to_string(),
            });
        }

        let connection = Arc::new(MockConnection {
            address: address.to_string(),
            behavior,
            sent: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

/// An in-memory database holding one bookmark, and that bookmark's id.
pub async fn database_with_bookmark() -> (Database, i64) {
    let db = Database::in_memory().await.unwrap();
    let owner = user::find_or_create_by_public_key(db.pool(), "npub-test")
        .await
        .unwrap();
    let saved = bookmark::create_manual_bookmark(
        db.pool(),
        owner.id,
        "https://example.com/post",
        "Example post",
        Some("Notes"),
    )
    .await
    .unwrap();
    (db, saved.id)
}

pub fn bookmark_event() -> SignedEvent {
    event::build(
        "npub-test",
        "https://example.com/post",
        "Example post",
        "Notes #rust",
        1700000000,
    )
    .into_signed("event-id", "signature")
}
