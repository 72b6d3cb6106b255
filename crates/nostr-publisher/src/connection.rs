use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookmark_core::SignedEvent;
use nostr_sdk::prelude::*;
use tracing::debug;

use crate::verify::to_nostr_event;
use crate::Error;

/// An open connection to one relay.
#[async_trait]
pub trait RelayConnection: Send + Sync {
    fn address(&self) -> &str;

    /// Send the event and wait for the relay's acknowledgement.
    ///
    /// Returns [`Error::Rejected`] when the relay answers with a negative OK.
    async fn send_event(&self, event: &SignedEvent) -> Result<(), Error>;

    async fn close(&self);
}

/// Opens relay connections.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RelayConnection>, Error>;
}

/// [`RelayConnector`] backed by one `nostr_sdk::Client` per relay.
#[derive(Debug, Clone)]
pub struct NostrRelayConnector {
    timeout: Duration,
}

impl NostrRelayConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RelayConnector for NostrRelayConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RelayConnection>, Error> {
        let client = Client::default();
        client.add_relay(address).await?;
        client
            .try_connect_relay(address, self.timeout)
            .await
            .map_err(|err| Error::Connect {
                relay: address.to_string(),
                message: err.to_string(),
            })?;

        debug!(relay = %address, "Connected to relay");
        Ok(Arc::new(NostrRelayConnection {
            address: address.to_string(),
            client,
        }))
    }
}

struct NostrRelayConnection {
    address: String,
    client: Client,
}

#[async_trait]
impl RelayConnection for NostrRelayConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_event(&self, event: &SignedEvent) -> Result<(), Error> {
        let event = to_nostr_event(event)?;
        let output = self.client.send_event(&event).await?;

        if !output.success.is_empty() {
            return Ok(());
        }

        match output.failed.into_values().next() {
            Some(message) => Err(Error::Rejected(message)),
            None => Err(Error::NoAcknowledgement),
        }
    }

    async fn close(&self) {
        self.client.disconnect().await;
        debug!(relay = %self.address, "Disconnected from relay");
    }
}
