//! Ingestion session state

use crate::domain::ImageRecord;
use crate::request::ImageQuery;
use serde::Serialize;

/// Monotonically increasing identity of one request/response cycle
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl Phase {
    /// A read loop is still contributing to this session
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Requesting | Phase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Where a session-fatal error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    /// Before any body bytes: bad status, refused connection.
    Request,
    /// After streaming began; records received so far are kept.
    Stream,
}

/// Status line texts
pub mod status {
    pub const FETCHING: &str = "Fetching images...";
    pub const STREAMING: &str = "Streaming images...";
    pub const FAILED: &str = "Failed to fetch images. See log for details.";
    pub const CANCELLED: &str = "Loading cancelled.";
    pub const LOCATION_UPDATED: &str = "Location updated. Click on the map to view images.";

    pub fn loaded_so_far(count: usize) -> String {
        format!("{STREAMING} {count} loaded")
    }

    pub fn all_loaded(count: usize) -> String {
        format!("All {count} images loaded.")
    }

    pub fn stream_error(message: &str) -> String {
        format!("Error: {message}")
    }
}

/// One request/response cycle and everything it has accumulated
#[derive(Debug, Clone)]
pub struct IngestionSession {
    pub id: SessionId,
    pub query: ImageQuery,
    /// Append-only; insertion order is arrival order.
    pub records: Vec<ImageRecord>,
    pub phase: Phase,
    pub status_text: String,
    pub failure: Option<FailureStage>,
    /// Lines skipped as malformed
    pub malformed: usize,
    /// Embedded `{"error": ...}` objects seen
    pub notices: usize,
}

impl IngestionSession {
    pub fn new(id: SessionId, query: ImageQuery) -> Self {
        Self {
            id,
            query,
            records: Vec::new(),
            phase: Phase::Requesting,
            status_text: status::FETCHING.to_string(),
            failure: None,
            malformed: 0,
            notices: 0,
        }
    }
}
