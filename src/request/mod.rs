//! Outbound query construction for the image server

use crate::domain::{LatLng, Source};
use crate::errors::{FetchError, FetchResult};
use chrono::NaiveDate;
use url::Url;

const API_PREFIX: &str = "/api/v1";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Endpoint serving the given source; `None` selects the generic feed
pub fn endpoint(source: Option<Source>) -> &'static str {
    match source {
        None => "images",
        Some(Source::Naip) => "high-res-images",
        Some(Source::Sentinel1) => "sentinel1",
        Some(Source::Sentinel2) => "sentinel2",
        Some(Source::Sentinel3) => "sentinel3",
        Some(Source::Landsat8) => "landsat8",
    }
}

/// Everything needed to request one image timeline.
///
/// Date ordering is not checked here; the server owns that rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub location: LatLng,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub source: Option<Source>,
}

impl ImageQuery {
    pub fn new(location: LatLng, source: Option<Source>) -> Self {
        Self {
            location,
            start_date: None,
            end_date: None,
            source,
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn endpoint(&self) -> &'static str {
        endpoint(self.source)
    }

    /// `/api/v1/{endpoint}?lat=..&lon=..[&start_date=..][&end_date=..]`
    pub fn path_and_query(&self) -> String {
        let mut out = format!(
            "{}/{}?lat={}&lon={}",
            API_PREFIX,
            self.endpoint(),
            self.location.lat,
            self.location.lng
        );
        if let Some(start) = self.start_date {
            out.push_str(&format!("&start_date={}", start.format(DATE_FORMAT)));
        }
        if let Some(end) = self.end_date {
            out.push_str(&format!("&end_date={}", end.format(DATE_FORMAT)));
        }
        out
    }

    /// Resolve against the server origin
    pub fn url(&self, base: &Url) -> FetchResult<Url> {
        if !self.location.lat.is_finite() || !self.location.lng.is_finite() {
            return Err(FetchError::InvalidRequest(format!(
                "non-finite coordinates: {:?}",
                self.location
            )));
        }
        base.join(&self.path_and_query())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))
    }
}
