//! Publication ledger: the latest delivery outcome per (bookmark, relay).
//!
//! Attempts overwrite each other; no history is kept.

use std::collections::BTreeSet;

use sqlx::SqlitePool;
use tracing::debug;

use crate::models::Publication;
use crate::Result;

/// Record the outcome of delivering a bookmark's event to a relay.
///
/// Upserts on (bookmark, relay): an existing row gets the new `success`,
/// `error_message` and a fresh `published_at`.
pub async fn record_outcome(
    pool: &SqlitePool,
    bookmark_id: i64,
    relay_id: i64,
    success: bool,
    error_message: Option<&str>,
) -> Result<Publication> {
    let publication = sqlx::query_as::<_, Publication>(
        r#"
        INSERT INTO publications (bookmark_id, relay_id, published_at, success, error_message)
        VALUES (?, ?, datetime('now'), ?, ?)
        ON CONFLICT(bookmark_id, relay_id) DO UPDATE SET
            published_at = excluded.published_at,
            success = excluded.success,
            error_message = excluded.error_message,
            updated_at = datetime('now')
        RETURNING id, bookmark_id, relay_id, published_at, success, error_message
        "#,
    )
    .bind(bookmark_id)
    .bind(relay_id)
    .bind(success)
    .bind(error_message)
    .fetch_one(pool)
    .await?;

    debug!(bookmark_id, relay_id, success, "Recorded publication outcome");
    Ok(publication)
}

/// Relays that accepted the bookmark's event on the latest attempt.
pub async fn successful_for(pool: &SqlitePool, bookmark_id: i64) -> Result<BTreeSet<i64>> {
    relays_with_outcome(pool, bookmark_id, true).await
}

/// Relays that did not accept the bookmark's event on the latest attempt.
pub async fn failed_for(pool: &SqlitePool, bookmark_id: i64) -> Result<BTreeSet<i64>> {
    relays_with_outcome(pool, bookmark_id, false).await
}

async fn relays_with_outcome(
    pool: &SqlitePool,
    bookmark_id: i64,
    success: bool,
) -> Result<BTreeSet<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT relay_id
        FROM publications
        WHERE bookmark_id = ? AND success = ?
        "#,
    )
    .bind(bookmark_id)
    .bind(success)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(relay_id,)| relay_id).collect())
}

/// All outcome rows for a bookmark.
pub async fn list_for_bookmark(pool: &SqlitePool, bookmark_id: i64) -> Result<Vec<Publication>> {
    let rows = sqlx::query_as::<_, Publication>(
        r#"
        SELECT id, bookmark_id, relay_id, published_at, success, error_message
        FROM publications
        WHERE bookmark_id = ?
        ORDER BY relay_id
        "#,
    )
    .bind(bookmark_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
