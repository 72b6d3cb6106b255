//! SQLite persistence for bookmarks, relays and publication outcomes.
//!
//! This crate provides async database operations using SQLx with SQLite.
//! The publication ledger ([`publication`]) keeps exactly one outcome row per
//! (bookmark, relay) pair.
//!
//! # Example
//!
//! ```no_run
//! use database::{bookmark, publication, relay, user, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:bookmarks.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let owner = user::find_or_create_by_public_key(db.pool(), "npub1...").await?;
//!     let saved = bookmark::create_manual_bookmark(
//!         db.pool(),
//!         owner.id,
//!         "www.example.com/post/",
//!         "Example post",
//!         None,
//!     )
//!     .await?;
//!
//!     let relay = relay::find_or_create_relay(db.pool(), "wss://relay.damus.io").await?;
//!     publication::record_outcome(db.pool(), saved.id, relay.id, true, None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod bookmark;
pub mod error;
pub mod models;
pub mod publication;
pub mod relay;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{Bookmark, Publication, Relay, User};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Handle to the bookmark store. Cheap to clone; clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Sized for one writer per relay during a publication fan-out.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Open the bookmark database at `url`, e.g.
    /// `sqlite:data/bookmarks.db?mode=rwc`. Call [`Database::migrate`] before
    /// first use.
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// let db = database::Database::connect("sqlite:data/bookmarks.db?mode=rwc").await?;
    /// db.migrate().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect with an explicit pool size.
    ///
    /// Foreign keys are enforced so deleting a bookmark drops its ledger rows.
    /// `sqlite::memory:` must use a pool size of 1, since every connection
    /// would otherwise open its own empty database.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Opened bookmark database");
        Ok(Self { pool })
    }

    /// Connect to a private in-memory database and run migrations.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Create or upgrade the users, bookmarks, relays and publications tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("Bookmark schema is up to date");
        Ok(())
    }

    /// Pool handed to the per-table functions ([`bookmark`], [`relay`], ...).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight queries and close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
