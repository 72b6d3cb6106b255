//! Input validation for bookmark fields.

use std::fmt;

use bookmark_core::url;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// URL is not an acceptable bookmark target.
    InvalidUrl(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUrl(url) => write!(f, "{} is not a valid URL", url),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for bookmark URLs.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum allowed length for bookmark titles.
pub const MAX_TITLE_LENGTH: usize = 512;

/// Validate a bookmark URL and return its canonical form.
pub fn validate_bookmark_url(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::Empty("url".to_string()));
    }

    if raw.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "url".to_string(),
            max: MAX_URL_LENGTH,
            actual: raw.len(),
        });
    }

    if !url::is_valid(raw) {
        return Err(ValidationError::InvalidUrl(raw.to_string()));
    }

    url::canonicalize(raw, false).map_err(|_| ValidationError::InvalidUrl(raw.to_string()))
}

/// Validate a bookmark title.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Empty("title".to_string()));
    }

    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: MAX_TITLE_LENGTH,
            actual: length,
        });
    }

    Ok(())
}

/// Validate a user public key.
pub fn validate_public_key(public_key: &str) -> Result<(), ValidationError> {
    if public_key.trim().is_empty() {
        return Err(ValidationError::Empty("public key".to_string()));
    }
    Ok(())
}
