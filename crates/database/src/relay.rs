//! Relay registry.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DatabaseError, Result};
use crate::models::Relay;

/// Get a relay by URL.
pub async fn get_relay_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Relay>> {
    let relay = sqlx::query_as::<_, Relay>(
        r#"
        SELECT id, url, name, description, last_connected_at
        FROM relays
        WHERE url = ?
        "#,
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(relay)
}

/// Get a relay by ID.
pub async fn get_relay(pool: &SqlitePool, id: i64) -> Result<Relay> {
    sqlx::query_as::<_, Relay>(
        r#"
        SELECT id, url, name, description, last_connected_at
        FROM relays
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Relay",
        id: id.to_string(),
    })
}

/// Return the relay registered under `url`, inserting it if needed.
pub async fn find_or_create_relay(pool: &SqlitePool, url: &str) -> Result<Relay> {
    let url = url.trim();

    // No-op update so RETURNING yields the existing row too.
    let relay = sqlx::query_as::<_, Relay>(
        r#"
        INSERT INTO relays (url)
        VALUES (?)
        ON CONFLICT(url) DO UPDATE SET url = excluded.url
        RETURNING id, url, name, description, last_connected_at
        "#,
    )
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(relay)
}

/// Register every configured relay address.
pub async fn register_relays(pool: &SqlitePool, urls: &[String]) -> Result<Vec<Relay>> {
    let mut relays = Vec::with_capacity(urls.len());
    for url in urls {
        relays.push(find_or_create_relay(pool, url).await?);
    }

    info!(count = relays.len(), "Registered relays");
    Ok(relays)
}

/// List all relays.
pub async fn list_relays(pool: &SqlitePool) -> Result<Vec<Relay>> {
    let rows = sqlx::query_as::<_, Relay>(
        r#"
        SELECT id, url, name, description, last_connected_at
        FROM relays
        ORDER BY url
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Record a successful connection to a relay.
pub async fn mark_connected(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE relays
        SET last_connected_at = datetime('now'),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Relay",
            id: id.to_string(),
        });
    }

    Ok(())
}
