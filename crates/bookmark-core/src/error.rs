use thiserror::Error;

/// Errors produced while canonicalizing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The input could not be parsed even after prepending a default scheme.
    #[error("malformed URL {input:?}: {reason}")]
    MalformedInput { input: String, reason: String },
}

/// Errors produced while parsing and validating a web bookmark event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event kind: expected 39701, got {0}")]
    InvalidKind(String),
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("missing d tag")]
    MissingDTag,
    #[error("malformed event: {0}")]
    Malformed(String),
    #[error("serde json error: {0}")]
    Json(#[from] serde_json::Error),
}
