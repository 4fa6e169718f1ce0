// src/error.rs
use thiserror::Error;

/// Max chars of a response body carried inside an error.
pub const ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing or invalid configuration: {0}")]
    Config(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("feed error: {0}")]
    Feed(String),
}

impl RelayError {
    /// Build a status error, truncating the body for log lines.
    pub fn status(status: u16, body: &str) -> Self {
        RelayError::Status {
            status,
            body: truncate_chars(body.trim(), ERROR_BODY_CHARS),
        }
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
