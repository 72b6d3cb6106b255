//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user, identified by their Nostr public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Nostr public key (hex or npub).
    pub public_key: String,
    /// Optional display name.
    pub username: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// A bookmark owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Canonical URL.
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    /// Signed event id, or a locally generated token for manual bookmarks.
    pub event_id: String,
    /// Serialized signed event JSON, when the bookmark came from one.
    pub signed_event_content: Option<String>,
    pub signed_event_sig: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// A relay that events are published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Relay {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Relay address (e.g., "wss://relay.damus.io").
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Last successful connection, if any.
    pub last_connected_at: Option<String>,
}

/// The latest delivery outcome of one bookmark's event to one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Publication {
    /// Auto-incrementing ID.
    pub id: i64,
    pub bookmark_id: i64,
    pub relay_id: i64,
    /// Time of the latest attempt.
    pub published_at: String,
    pub success: bool,
    pub error_message: Option<String>,
}
