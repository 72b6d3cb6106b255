//! Store one signed bookmark event and publish it in the foreground.
//!
//! This is the synchronous path: the process waits for the retry loop to
//! finish and exits non-zero on total failure. Long-running services that
//! create bookmarks should hand them to `PublishQueue` instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use bookmark_core::event;
use database::{bookmark, publication, relay, user, Database};
use nostr_publisher::{
    verify_signature, NostrRelayConnector, PublicationOrchestrator, PublishReport,
    PublisherConfig, RelayPublisher, RetryPolicy,
};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/bookmarks.db?mode=rwc";

#[derive(Debug, Parser)]
#[command(name = "publish-bookmark")]
#[command(about = "Store a signed web bookmark event and publish it to Nostr relays")]
struct Args {
    /// SQLite database URL. Falls back to DATABASE_URL.
    #[arg(long)]
    db: Option<String>,
    /// Relay URL; repeatable. Falls back to NOSTR_RELAYS.
    #[arg(long)]
    relay: Vec<String>,
    /// Path to the signed event JSON.
    #[arg(long)]
    event: PathBuf,
    /// Bookmark URL. Defaults to https:// plus the event's d tag.
    #[arg(long)]
    url: Option<String>,
    /// Title used when the event has no title tag.
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Skip Schnorr signature verification.
    #[arg(long)]
    skip_verify: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.event)?;
    let signed = event::parse_and_validate_json(&raw)?;
    if args.skip_verify {
        warn!(event_id = %signed.id, "Skipping signature verification");
    } else {
        verify_signature(&signed)?;
    }

    let mut config = if args.relay.is_empty() {
        PublisherConfig::from_env()?
    } else {
        PublisherConfig::new(args.relay)
    };
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    let mut retry = RetryPolicy::from_env()?;
    if let Some(max_attempts) = args.max_attempts {
        retry.max_attempts = max_attempts;
    }

    let db_url = args
        .db
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&db_url).await?;
    db.migrate().await?;

    let saved = match bookmark::get_bookmark_by_event_id(db.pool(), &signed.id).await {
        Ok(existing) => {
            info!(bookmark_id = existing.id, "Event already stored, republishing");
            existing
        }
        Err(err) if err.is_not_found() => {
            let owner = user::find_or_create_by_public_key(db.pool(), &signed.pubkey).await?;
            let url = args
                .url
                .unwrap_or_else(|| format!("https://{}", signed.d_tag().unwrap_or_default()));
            bookmark::create_signed_bookmark(db.pool(), owner.id, &url, args.title.as_deref(), &signed)
                .await?
        }
        Err(err) => return Err(err.into()),
    };

    relay::register_relays(db.pool(), &config.relays).await?;

    let connector = Arc::new(NostrRelayConnector::new(config.timeout));
    let publisher = RelayPublisher::new(db.clone(), connector, config);
    let orchestrator = PublicationOrchestrator::new(publisher, retry);

    let report = orchestrator.publish_with_retry(&signed, saved.id).await;

    for row in publication::list_for_bookmark(db.pool(), saved.id).await? {
        let endpoint = relay::get_relay(db.pool(), row.relay_id).await?;
        info!(
            relay = %endpoint.url,
            success = row.success,
            error = row.error_message.as_deref().unwrap_or(""),
            published_at = %row.published_at,
            "Publication"
        );
    }
    db.close().await;

    match report? {
        PublishReport::Published(results) => {
            let succeeded = results.values().filter(|outcome| outcome.success).count();
            info!(bookmark_id = saved.id, succeeded, total = results.len(), "Published bookmark");
        }
        PublishReport::Skipped(reason) => {
            warn!(bookmark_id = saved.id, ?reason, "Publication skipped");
        }
    }

    Ok(())
}
