//! Which record the detail viewer is showing.

use crate::domain::ImageRecord;
use crate::view::DetailView;

/// Where a click inside the open viewer landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerClick {
    Backdrop,
    CloseButton,
    /// Inside the image/metadata panel; must not reach the backdrop handler.
    Content,
}

/// Holds the current selection. The viewer is open iff something is selected.
#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    selected: Option<ImageRecord>,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, record: ImageRecord) {
        self.selected = Some(record);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&ImageRecord> {
        self.selected.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }

    /// Route a click from the viewer. Returns whether the viewer closed.
    pub fn handle_click(&mut self, click: ViewerClick) -> bool {
        match click {
            ViewerClick::Backdrop | ViewerClick::CloseButton if self.is_open() => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    pub fn detail(&self) -> Option<DetailView> {
        self.selected.as_ref().map(DetailView::new)
    }
}
