//! Bookmark operations.
//!
//! URLs are stored in canonical form. A user may hold at most one bookmark per
//! target, where "same target" is [`bookmark_core::url::equivalent`]: scheme,
//! `www.`, case, trailing slash and query differences are ignored.

use bookmark_core::event::{self, SignedEvent};
use bookmark_core::url;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DatabaseError, Result};
use crate::models::Bookmark;
use crate::validation::{validate_bookmark_url, validate_title, ValidationError};

/// Identifier prefix of bookmarks created without a signed event.
pub const MANUAL_EVENT_PREFIX: &str = "manual-";

struct NewBookmark {
    user_id: i64,
    url: String,
    title: String,
    description: Option<String>,
    event_id: String,
    signed_event_content: Option<String>,
    signed_event_sig: Option<String>,
}

/// Create a bookmark from a validated signed event.
///
/// The event's `title` tag wins over `fallback_title`; the description is the
/// event content. The bookmark's identifier is the event id.
pub async fn create_signed_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    url: &str,
    fallback_title: Option<&str>,
    signed: &SignedEvent,
) -> Result<Bookmark> {
    let url = validate_bookmark_url(url)?;
    let title = event::extract_title(signed)
        .filter(|title| !title.trim().is_empty())
        .or_else(|| fallback_title.map(String::from))
        .ok_or_else(|| ValidationError::Empty("title".to_string()))?;
    validate_title(&title)?;

    let description = Some(event::extract_description(signed)).filter(|d| !d.is_empty());

    insert_bookmark(
        pool,
        NewBookmark {
            user_id,
            url,
            title,
            description,
            event_id: signed.id.clone(),
            signed_event_content: Some(signed.to_json()?),
            signed_event_sig: Some(signed.sig.clone()),
        },
    )
    .await
}

/// Create a plain bookmark without a signed event.
///
/// The identifier is a locally generated token prefixed with `manual-`, which
/// marks bookmarks that have no Nostr event behind them.
pub async fn create_manual_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    url: &str,
    title: &str,
    description: Option<&str>,
) -> Result<Bookmark> {
    let url = validate_bookmark_url(url)?;
    validate_title(title)?;

    insert_bookmark(
        pool,
        NewBookmark {
            user_id,
            url,
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            event_id: format!("{MANUAL_EVENT_PREFIX}{}", uuid::Uuid::new_v4().simple()),
            signed_event_content: None,
            signed_event_sig: None,
        },
    )
    .await
}

async fn insert_bookmark(pool: &SqlitePool, new: NewBookmark) -> Result<Bookmark> {
    let mut tx = pool.begin().await?;

    let existing: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT id, url
        FROM bookmarks
        WHERE user_id = ?
        "#,
    )
    .bind(new.user_id)
    .fetch_all(&mut *tx)
    .await?;

    if let Some((existing_id, _)) = existing
        .iter()
        .find(|(_, stored)| url::equivalent(stored, &new.url, false))
    {
        debug!(user_id = new.user_id, url = %new.url, existing_id, "Duplicate bookmark rejected");
        return Err(DatabaseError::DuplicateBookmark {
            url: new.url,
            existing_id: *existing_id,
        });
    }

    let bookmark = sqlx::query_as::<_, Bookmark>(
        r#"
        INSERT INTO bookmarks
            (user_id, url, title, description, event_id, signed_event_content, signed_event_sig)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, user_id, url, title, description, event_id,
                  signed_event_content, signed_event_sig, created_at
        "#,
    )
    .bind(new.user_id)
    .bind(&new.url)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.event_id)
    .bind(&new.signed_event_content)
    .bind(&new.signed_event_sig)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Bookmark",
                    id: new.event_id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    tx.commit().await?;

    info!(
        bookmark_id = bookmark.id,
        event_id = %bookmark.event_id,
        url = %bookmark.url,
        "Created bookmark"
    );
    Ok(bookmark)
}

/// Get a bookmark by ID.
pub async fn get_bookmark(pool: &SqlitePool, id: i64) -> Result<Bookmark> {
    sqlx::query_as::<_, Bookmark>(
        r#"
        SELECT id, user_id, url, title, description, event_id,
               signed_event_content, signed_event_sig, created_at
        FROM bookmarks
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Bookmark",
        id: id.to_string(),
    })
}

/// Get a bookmark by its external identifier.
pub async fn get_bookmark_by_event_id(pool: &SqlitePool, event_id: &str) -> Result<Bookmark> {
    sqlx::query_as::<_, Bookmark>(
        r#"
        SELECT id, user_id, url, title, description, event_id,
               signed_event_content, signed_event_sig, created_at
        FROM bookmarks
        WHERE event_id = ?
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Bookmark",
        id: event_id.to_string(),
    })
}

/// List a user's bookmarks, newest first.
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Bookmark>> {
    let rows = sqlx::query_as::<_, Bookmark>(
        r#"
        SELECT id, user_id, url, title, description, event_id,
               signed_event_content, signed_event_sig, created_at
        FROM bookmarks
        WHERE user_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Find any bookmark whose URL is equivalent to `raw`.
pub async fn find_by_url(pool: &SqlitePool, raw: &str) -> Result<Option<Bookmark>> {
    let Ok(canonical) = url::canonicalize(raw, false) else {
        return Ok(None);
    };

    let exact = sqlx::query_as::<_, Bookmark>(
        r#"
        SELECT id, user_id, url, title, description, event_id,
               signed_event_content, signed_event_sig, created_at
        FROM bookmarks
        WHERE url = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(&canonical)
    .fetch_optional(pool)
    .await?;

    if exact.is_some() {
        return Ok(exact);
    }

    let all = sqlx::query_as::<_, Bookmark>(
        r#"
        SELECT id, user_id, url, title, description, event_id,
               signed_event_content, signed_event_sig, created_at
        FROM bookmarks
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(all
        .into_iter()
        .find(|bookmark| url::equivalent(&bookmark.url, raw, false)))
}

/// Whether `user_id` already bookmarked a URL equivalent to `raw`.
pub async fn user_has_bookmarked(pool: &SqlitePool, user_id: i64, raw: &str) -> Result<bool> {
    let urls: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT url
        FROM bookmarks
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(urls
        .iter()
        .any(|(stored,)| url::equivalent(stored, raw, false)))
}

/// Delete a bookmark by ID. Its publication rows go with it.
pub async fn delete_bookmark(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM bookmarks
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Bookmark",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Re-parse the signed event stored with a bookmark, if it has one.
pub fn signed_event(bookmark: &Bookmark) -> Option<Result<SignedEvent>> {
    bookmark
        .signed_event_content
        .as_deref()
        .map(|json| event::parse_and_validate_json(json).map_err(DatabaseError::from))
}
