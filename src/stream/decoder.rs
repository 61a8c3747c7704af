//! Per-line record decoding. Failures stay local to the line.

use crate::domain::{ImageRecord, StreamError};
use crate::utils::{preview, text};
use serde_json::Value;
use tracing::{error, warn};

const LOG_PREVIEW_CHARS: usize = 160;

/// Outcome of decoding one NDJSON line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Image(ImageRecord),
    Notice(StreamError),
    Malformed(MalformedRecord),
}

/// A line that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub line: String,
    pub reason: String,
}

/// Decode one reassembled line. Never fails; problems are logged here and
/// reported as [`Decoded::Malformed`] so the stream keeps going.
pub fn decode_line(line: &str) -> Decoded {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return malformed(line, e.to_string()),
    };

    let Value::Object(obj) = value else {
        return malformed(line, "expected a JSON object".to_string());
    };

    if let Some(err) = obj.get("error") {
        let message = text(err);
        error!(detail = %message, "stream error reported by image server");
        return Decoded::Notice(StreamError { message });
    }

    Decoded::Image(ImageRecord::from_object(&obj))
}

fn malformed(line: &str, reason: String) -> Decoded {
    warn!(reason = %reason, line = %preview(line, LOG_PREVIEW_CHARS), "skipping malformed record");
    Decoded::Malformed(MalformedRecord {
        line: line.to_string(),
        reason,
    })
}
