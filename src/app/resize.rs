//! Drag-to-resize of the timeline panel, scoped to one gesture.

use tracing::debug;

pub const DEFAULT_PANEL_HEIGHT: f64 = 250.0;
pub const MIN_PANEL_HEIGHT: f64 = 100.0;
pub const MAX_PANEL_FRACTION: f64 = 0.8;

#[derive(Debug)]
pub struct PanelLayout {
    height: f64,
    dragging: bool,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            height: DEFAULT_PANEL_HEIGHT,
            dragging: false,
        }
    }
}

impl PanelLayout {
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Press on the resize handle. The panel tracks the pointer for as long
    /// as the returned gesture lives.
    pub fn begin_resize(&mut self, viewport_height: f64) -> ResizeGesture<'_> {
        self.dragging = true;
        debug!(viewport_height, "resize started");
        ResizeGesture {
            layout: self,
            viewport_height,
        }
    }
}

/// Pointer capture for one drag. Dropping it releases the capture, so
/// mouse-up, pointer-leave and early returns all end the drag.
#[derive(Debug)]
pub struct ResizeGesture<'a> {
    layout: &'a mut PanelLayout,
    viewport_height: f64,
}

impl ResizeGesture<'_> {
    /// Pointer moved to `pointer_y` (viewport coordinates). Returns whether
    /// the height changed; heights outside the bounds are ignored.
    pub fn pointer_moved(&mut self, pointer_y: f64) -> bool {
        let height = self.viewport_height - pointer_y;
        if height > MIN_PANEL_HEIGHT && height < self.viewport_height * MAX_PANEL_FRACTION {
            self.layout.height = height;
            true
        } else {
            false
        }
    }

    pub fn release(self) {}
}

impl Drop for ResizeGesture<'_> {
    fn drop(&mut self) {
        self.layout.dragging = false;
        debug!(height = self.layout.height, "resize released");
    }
}
