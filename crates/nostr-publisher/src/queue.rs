use std::sync::Arc;

use bookmark_core::SignedEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::orchestrator::{PublicationOrchestrator, PublishReport};
use crate::Error;

/// A bookmark event waiting to be published.
#[derive(Debug, Clone)]
pub struct PublishJob {
    pub event: SignedEvent,
    pub bookmark_id: i64,
}

/// Background worker that publishes queued jobs one at a time, each with
/// the orchestrator's retry policy.
///
/// Services enqueue a job right after storing a signed bookmark; the caller
/// does not wait for relays. The `publish-bookmark` binary skips the queue
/// and runs the retry loop in the foreground.
#[derive(Clone)]
pub struct PublishQueue {
    sender: mpsc::Sender<PublishJob>,
}

impl PublishQueue {
    /// Spawn the worker. It runs until every `PublishQueue` handle is dropped
    /// and the remaining jobs are drained.
    pub fn spawn(
        orchestrator: Arc<PublicationOrchestrator>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<PublishJob>(capacity);

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                debug!(bookmark_id = job.bookmark_id, event_id = %job.event.id, "Processing publish job");
                match orchestrator
                    .publish_with_retry(&job.event, job.bookmark_id)
                    .await
                {
                    Ok(PublishReport::Published(results)) => {
                        let succeeded = results.values().filter(|outcome| outcome.success).count();
                        info!(bookmark_id = job.bookmark_id, succeeded, total = results.len(), "Publish job done");
                    }
                    Ok(PublishReport::Skipped(reason)) => {
                        info!(bookmark_id = job.bookmark_id, ?reason, "Publish job skipped");
                    }
                    Err(err) => {
                        error!(bookmark_id = job.bookmark_id, error = %err, "Publish job failed");
                    }
                }
            }
            debug!("Publish queue closed");
        });

        (Self { sender }, handle)
    }

    pub async fn enqueue(&self, job: PublishJob) -> Result<(), Error> {
        self.sender.send(job).await.map_err(|_| Error::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use database::publication;

    use super::*;
    use crate::config::{PublisherConfig, RetryPolicy};
    use crate::publish::RelayPublisher;
    use crate::testing::{bookmark_event, database_with_bookmark, Behavior, MockConnector};

    #[tokio::test]
    async fn test_queue_publishes_jobs() {
        let (db, bookmark_id) = database_with_bookmark().await;
        let connector = Arc::new(MockConnector::new(&[("wss://a.example.com", Behavior::Accept)]));
        let publisher = RelayPublisher::new(
            db.clone(),
            connector,
            PublisherConfig::new(vec!["wss://a.example.com".to_string()]),
        );
        let retry = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let orchestrator = Arc::new(PublicationOrchestrator::new(publisher, retry));

        let (queue, handle) = PublishQueue::spawn(orchestrator, 4);
        queue
            .enqueue(PublishJob {
                event: bookmark_event(),
                bookmark_id,
            })
            .await
            .unwrap();
        drop(queue);
        handle.await.unwrap();

        let published = publication::successful_for(db.pool(), bookmark_id)
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
    }
}
