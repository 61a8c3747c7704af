//! Application shell: map events in, session and selection state out

pub mod resize;
pub mod selection;

use crate::domain::{ImageRecord, LatLng, Source};
use crate::request::ImageQuery;
use crate::services::{status, Phase, SessionId, StreamController, Update};
use crate::view::{render_timeline, DetailView};
use chrono::NaiveDate;
use tracing::info;

pub use resize::{PanelLayout, ResizeGesture};
pub use selection::{SelectionCoordinator, ViewerClick};

/// Date range and source selector controls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub source: Option<Source>,
}

impl Filters {
    pub fn query(&self, location: LatLng) -> ImageQuery {
        ImageQuery::new(location, self.source).with_dates(self.start_date, self.end_date)
    }
}

pub struct App {
    controller: StreamController,
    selection: SelectionCoordinator,
    layout: PanelLayout,
    filters: Filters,
    marker: Option<LatLng>,
    hint: Option<String>,
}

impl App {
    pub fn new(controller: StreamController, filters: Filters) -> Self {
        Self {
            controller,
            selection: SelectionCoordinator::new(),
            layout: PanelLayout::default(),
            filters,
            marker: None,
            hint: None,
        }
    }

    pub fn filters_mut(&mut self) -> &mut Filters {
        &mut self.filters
    }

    /// Map click: drop a marker and load the timeline for that point.
    ///
    /// Any open viewer is closed, since its record belongs to the previous
    /// location. A repeat of the selection already loading changes nothing.
    pub fn on_location_select(&mut self, at: LatLng) -> SessionId {
        let previous = self.controller.session().map(|s| s.id);
        let id = self.controller.start_ingestion(self.filters.query(at));
        if previous == Some(id) {
            return id;
        }
        self.marker = Some(at);
        self.hint = None;
        self.selection.clear();
        id
    }

    /// Place search finished: the map recentres, nothing is fetched.
    pub fn on_search_complete(&mut self, at: LatLng) {
        info!(lat = at.lat, lng = at.lng, "search complete");
        self.hint = Some(status::LOCATION_UPDATED.to_string());
    }

    /// Apply the next session change. The status line then shows the
    /// session status again, replacing any search hint.
    pub async fn next_update(&mut self) -> Option<Update> {
        let update = self.controller.next_update().await?;
        self.hint = None;
        Some(update)
    }

    pub fn cancel(&mut self) {
        self.controller.cancel();
    }

    pub fn records(&self) -> &[ImageRecord] {
        self.controller.records()
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Status line: whichever of the session status and the search hint
    /// was written last.
    pub fn status_line(&self) -> &str {
        match (&self.hint, self.controller.session()) {
            (Some(hint), _) => hint.as_str(),
            (None, Some(_)) => self.controller.status_text(),
            (None, None) => "",
        }
    }

    /// Text for the blocking overlay over the map, shown until the
    /// response is accepted
    pub fn loading_overlay(&self) -> Option<&str> {
        self.controller
            .is_loading()
            .then(|| self.controller.status_text())
    }

    pub fn timeline(&self) -> String {
        let status = self
            .controller
            .is_streaming()
            .then(|| self.status_line());
        render_timeline(self.records(), status)
    }

    pub fn marker(&self) -> Option<LatLng> {
        self.marker
    }

    /// Timeline item click
    pub fn select_record(&mut self, index: usize) -> bool {
        match self.controller.records().get(index) {
            Some(record) => {
                self.selection.select(record.clone());
                true
            }
            None => false,
        }
    }

    pub fn select_by_id(&mut self, raw_id: &str) -> bool {
        let found = self
            .controller
            .records()
            .iter()
            .position(|r| r.id.as_ref().is_some_and(|id| id.matches(raw_id)));
        found.is_some_and(|index| self.select_record(index))
    }

    pub fn viewer_click(&mut self, click: ViewerClick) -> bool {
        self.selection.handle_click(click)
    }

    pub fn detail(&self) -> Option<DetailView> {
        self.selection.detail()
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn layout_mut(&mut self) -> &mut PanelLayout {
        &mut self.layout
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }
}
