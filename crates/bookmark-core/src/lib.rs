//! Core bookmark logic: URL canonicalization and NIP-B0 web bookmark events.
//!
//! Everything in this crate is synchronous and free of I/O. The persistence
//! layer (`database`) and the relay publisher (`nostr-publisher`) build on it.
//!
//! # URLs
//!
//! ```
//! use bookmark_core::url;
//!
//! assert_eq!(url::canonicalize("EXAMPLE.com/", false).unwrap(), "https://example.com");
//! assert!(url::equivalent("http://example.com", "https://www.example.com/", false));
//! assert_eq!(url::extract_resource_tag("https://example.com/post?x=1#s"), "example.com/post");
//! ```
//!
//! # Events
//!
//! | Kind | Constant | Purpose | Tag |
//! |------|----------|---------|-----|
//! | 39701 | `KIND_WEB_BOOKMARK` | Web bookmark (NIP-B0) | `d=<url without scheme/query/fragment>` |
//!
//! ```
//! use bookmark_core::event;
//!
//! let unsigned = event::build("pubkey", "https://alice.blog/post?x=1", "Title", "about #rust", 1738869705);
//! let signed = unsigned.into_signed("event-id", "signature");
//! let json = signed.to_json().unwrap();
//!
//! let parsed = event::parse_and_validate_json(&json).unwrap();
//! assert_eq!(event::extract_title(&parsed).as_deref(), Some("Title"));
//! ```

mod error;
pub mod event;
pub mod url;

pub use error::{EventError, UrlError};
pub use event::{
    EventMetadata, SignedEvent, Tag, UnsignedEvent, KIND_WEB_BOOKMARK, TAG_D, TAG_HASHTAG,
    TAG_PUBLISHED_AT, TAG_TITLE,
};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
