//! Domain models for the application

use crate::utils::{epoch_to_utc, num, seconds, text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A geographic point picked on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Imagery source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Sentinel1,
    #[default]
    Sentinel2,
    Sentinel3,
    Landsat8,
    Naip,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Sentinel2,
        Source::Sentinel1,
        Source::Landsat8,
        Source::Sentinel3,
        Source::Naip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Sentinel1 => "sentinel1",
            Source::Sentinel2 => "sentinel2",
            Source::Sentinel3 => "sentinel3",
            Source::Landsat8 => "landsat8",
            Source::Naip => "naip",
        }
    }

    /// Human label shown by the source selector
    pub fn label(self) -> &'static str {
        match self {
            Source::Sentinel2 => "Sentinel-2 (Optical, 10m)",
            Source::Sentinel1 => "Sentinel-1 (Radar, 10m, All-Weather)",
            Source::Landsat8 => "Landsat 8 (Optical, 30m, Historical)",
            Source::Sentinel3 => "Sentinel-3 (Ocean/Land, 300m)",
            Source::Naip => "NAIP (US Only, 1m)",
        }
    }

    /// Radar sources carry no cloud cover
    pub fn is_radar(self) -> bool {
        matches!(self, Source::Sentinel1)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    /// Case-insensitive; `-`, `_` and spaces are ignored so that labels such
    /// as `Sentinel-2` or `LANDSAT_8` map onto their selector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == key)
            .ok_or_else(|| format!("unknown imagery source: {s}"))
    }
}

/// Opaque record identifier, unique within one response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    fn from_value(v: &Value) -> Self {
        match v.as_i64() {
            Some(n) => RecordId::Int(n),
            None => RecordId::Text(text(v)),
        }
    }

    /// Compare against an id typed by a user
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            RecordId::Int(n) => raw.trim().parse::<i64>().is_ok_and(|m| m == *n),
            RecordId::Text(s) => s == raw,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One satellite observation as streamed by the image server.
///
/// Only JSON well-formedness is required upstream, so every field is
/// optional; the view renders absent values as "unknown".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
}

impl ImageRecord {
    /// Read the image fields leniently from a decoded JSON object
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: obj.get("id").filter(|v| !v.is_null()).map(RecordId::from_value),
            timestamp: obj.get("timestamp").and_then(seconds),
            thumbnail_url: obj
                .get("thumbnail_url")
                .and_then(Value::as_str)
                .map(str::to_string),
            source: obj
                .get("source")
                .filter(|v| !v.is_null())
                .map(text),
            cloud_cover: obj.get("cloud_cover").and_then(num),
        }
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(epoch_to_utc)
    }

    /// Source selector this record belongs to, if the label is recognised
    pub fn source_kind(&self) -> Option<Source> {
        self.source.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Out-of-band error object embedded in the record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamError {
    pub message: String,
}
