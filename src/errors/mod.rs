//! Unified error handling module

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that end an ingestion session.
///
/// Per-record problems (malformed lines, embedded `{"error": ...}` objects)
/// never show up here; they are absorbed by the record decoder.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("image server returned HTTP {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("stream read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record exceeds {limit} bytes without a newline")]
    LineTooLong { limit: usize },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Short machine-readable classification used in diagnostic logs.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Status(status) => classify_status(*status),
            FetchError::Transport(e) => match e.status() {
                Some(status) => classify_status(status),
                None if e.is_connect() => "CONNECT_ERROR",
                None if e.is_timeout() => "TIMEOUT",
                None => "UPSTREAM_ERROR",
            },
            FetchError::Io(_) => "STREAM_IO",
            FetchError::LineTooLong { .. } => "LINE_TOO_LONG",
            FetchError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}

fn classify_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        403 => "UPSTREAM_403",
        404 => "UPSTREAM_404",
        429 => "UPSTREAM_429",
        500..=599 => "UPSTREAM_5XX",
        _ => "UPSTREAM_ERROR",
    }
}

/// Type alias for fetch results
pub type FetchResult<T> = Result<T, FetchError>;
