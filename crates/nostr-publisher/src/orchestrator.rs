//! One publication attempt per bookmark event, plus the bounded retry loop
//! around it.

use std::collections::BTreeMap;

use bookmark_core::{SignedEvent, KIND_WEB_BOOKMARK};
use database::bookmark;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::RetryPolicy;
use crate::error::PublishError;
use crate::publish::{Outcome, RelayPublisher};

/// Why an attempt was dropped without publishing. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidKind(u16),
    BookmarkMissing(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishReport {
    /// At least one relay accepted the event (or there were no relays).
    Published(BTreeMap<String, Outcome>),
    Skipped(SkipReason),
}

impl PublishReport {
    pub fn results(&self) -> Option<&BTreeMap<String, Outcome>> {
        match self {
            PublishReport::Published(results) => Some(results),
            PublishReport::Skipped(_) => None,
        }
    }
}

pub struct PublicationOrchestrator {
    publisher: RelayPublisher,
    retry: RetryPolicy,
}

impl PublicationOrchestrator {
    pub fn new(publisher: RelayPublisher, retry: RetryPolicy) -> Self {
        Self { publisher, retry }
    }

    pub fn publisher(&self) -> &RelayPublisher {
        &self.publisher
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Publish `event` for `bookmark_id` to every configured relay once.
    ///
    /// Returns [`PublishError::TotalFailure`] when relays were tried and none
    /// accepted the event. Connections are closed before returning.
    pub async fn attempt_publication(
        &self,
        event: &SignedEvent,
        bookmark_id: i64,
    ) -> Result<PublishReport, PublishError> {
        if event.kind != KIND_WEB_BOOKMARK {
            warn!(
                event_id = %event.id,
                kind = event.kind,
                "Not a web bookmark event, skipping publication"
            );
            return Ok(PublishReport::Skipped(SkipReason::InvalidKind(event.kind)));
        }

        match bookmark::get_bookmark(self.publisher.database().pool(), bookmark_id).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                warn!(bookmark_id, event_id = %event.id, "Bookmark not found, skipping publication");
                return Ok(PublishReport::Skipped(SkipReason::BookmarkMissing(bookmark_id)));
            }
            Err(err) => return Err(err.into()),
        }

        let results = self.publisher.publish_configured(event, bookmark_id).await;
        self.publisher.close_all().await;

        let succeeded = results.values().filter(|outcome| outcome.success).count();
        if !results.is_empty() && succeeded == 0 {
            error!(bookmark_id, event_id = %event.id, "Failed to publish to any relays");
            return Err(PublishError::TotalFailure {
                attempted: results.len(),
            });
        }

        info!(
            bookmark_id,
            event_id = %event.id,
            succeeded,
            total = results.len(),
            "Bookmark publication complete"
        );
        Ok(PublishReport::Published(results))
    }

    /// [`attempt_publication`](Self::attempt_publication), retried with
    /// exponential backoff while it fails retryably and attempts remain.
    pub async fn publish_with_retry(
        &self,
        event: &SignedEvent,
        bookmark_id: i64,
    ) -> Result<PublishReport, PublishError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt_publication(event, bookmark_id).await {
                Ok(report) => return Ok(report),
                Err(err) if err.is_retryable() && self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for_attempt(attempts - 1);
                    warn!(
                        bookmark_id,
                        attempt = attempts,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Publication failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    error!(bookmark_id, attempts, error = %err, "Giving up on publication");
                    return Err(err);
                }
            }
        }
    }
}
