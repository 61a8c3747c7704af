//! Text rendering of the timeline and the detail viewer

use crate::domain::ImageRecord;
use std::fmt;
use url::Url;

pub const EMPTY_TIMELINE: &str = "Select a location on the map to see the timeline.";
pub const FULL_DIMENSION: u32 = 1024;

const UNKNOWN: &str = "unknown";

fn date(record: &ImageRecord) -> String {
    record
        .captured_at()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// One timeline row: date, source, cloud cover, id
pub fn timeline_entry(record: &ImageRecord) -> String {
    let cloud = record
        .cloud_cover
        .map(|c| format!("{c:.0}%"))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let id = record
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!(
        "{}  {:<12}  cloud {:>7}  {}",
        date(record),
        record.source.as_deref().unwrap_or(UNKNOWN),
        cloud,
        id
    )
}

/// Full timeline panel; `status` is only passed while a session is in flight
pub fn render_timeline(records: &[ImageRecord], status: Option<&str>) -> String {
    let status = status.filter(|s| !s.is_empty());
    if records.is_empty() {
        return status.unwrap_or(EMPTY_TIMELINE).to_string();
    }
    let mut out = String::new();
    if let Some(status) = status {
        out.push_str(status);
        out.push('\n');
    }
    for record in records {
        out.push_str(&timeline_entry(record));
        out.push('\n');
    }
    out
}

/// Ask for the image at another pixel size by rewriting `dimensions`.
///
/// URLs without that parameter, or that do not parse, come back unchanged.
pub fn resize_thumbnail(thumbnail_url: &str, dimension: u32) -> String {
    let Ok(mut url) = Url::parse(thumbnail_url) else {
        return thumbnail_url.to_string();
    };
    if !url.query_pairs().any(|(k, _)| k == "dimensions") {
        return thumbnail_url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "dimensions" {
                dimension.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.into()
}

/// What the detail viewer shows for the selected record
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub image_url: Option<String>,
    pub captured_at: String,
    pub cloud_cover: Option<String>,
    pub source: String,
}

impl DetailView {
    pub fn new(record: &ImageRecord) -> Self {
        Self {
            image_url: record
                .thumbnail_url
                .as_deref()
                .map(|u| resize_thumbnail(u, FULL_DIMENSION)),
            captured_at: record
                .captured_at()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            cloud_cover: record.cloud_cover.map(|c| format!("{c:.2}%")),
            source: record.source.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

impl fmt::Display for DetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image: {}", self.image_url.as_deref().unwrap_or(UNKNOWN))?;
        writeln!(f, "Date: {}", self.captured_at)?;
        if let Some(cloud) = &self.cloud_cover {
            writeln!(f, "Cloud Cover: {cloud}")?;
        }
        write!(f, "Source: {}", self.source)
    }
}
