//! Reassembly of newline-delimited records from arbitrarily split chunks.

use crate::clients::ByteStream;
use crate::errors::{FetchError, FetchResult};
use bytes::{Buf, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};

/// Largest record accepted before a newline must appear (8 MiB).
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Buffers raw bytes and hands out complete lines.
///
/// Splitting happens on the `\n` byte before any UTF-8 decoding. That byte
/// never occurs inside a multi-byte sequence, so a character cut in half by
/// a chunk boundary stays intact until its line is complete.
#[derive(Debug)]
pub struct LineReassembler {
    pending: BytesMut,
    /// Bytes of `pending` already known to hold no newline.
    scanned: usize,
    limit: usize,
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            limit,
        }
    }

    /// Append one chunk; empty chunks are a no-op.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take the next complete, non-blank line with its delimiter stripped.
    ///
    /// `Ok(None)` means more input is needed.
    pub fn next_line(&mut self) -> FetchResult<Option<String>> {
        loop {
            let Some(offset) = self.pending[self.scanned..]
                .iter()
                .position(|b| *b == b'\n')
            else {
                self.scanned = self.pending.len();
                if self.pending.len() > self.limit {
                    return Err(FetchError::LineTooLong { limit: self.limit });
                }
                return Ok(None);
            };

            let end = self.scanned + offset;
            let raw = self.pending.split_to(end);
            self.pending.advance(1);
            self.scanned = 0;

            if let Some(line) = decode(&raw) {
                return Ok(Some(line));
            }
        }
    }

    /// Flush whatever trails after the last newline once the input has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let rest = self.pending.split();
        decode(&rest)
    }
}

fn decode(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

struct LineState {
    bytes: ByteStream,
    buf: LineReassembler,
    done: bool,
}

/// Lazily turn a chunk stream into a stream of complete lines.
///
/// The stream ends after the source ends (flushing a final unterminated
/// line) or after the first error.
pub fn lines(bytes: ByteStream) -> BoxStream<'static, FetchResult<String>> {
    let state = LineState {
        bytes,
        buf: LineReassembler::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }
            match st.buf.next_line() {
                Ok(Some(line)) => return Some((Ok(line), st)),
                Ok(None) => {}
                Err(e) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => st.buf.push(&chunk),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    return st.buf.finish().map(|line| (Ok(line), st));
                }
            }
        }
    })
    .boxed()
}
