//! Streaming client for satellite image timelines.
//!
//! A location query is sent to the image server, whose chunked NDJSON body is
//! reassembled into lines, decoded into records and accumulated by a
//! session state machine that the view layer renders as it grows.

pub mod app;
pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod request;
pub mod services;
pub mod stream;
pub mod utils;
#[cfg(test)]
mod test_support;
pub mod view;
