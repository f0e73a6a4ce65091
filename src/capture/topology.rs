//! Monitor layout of the virtual desktop
//!
//! A [`DisplayTopology`] is enumerated fresh for every capture call, since
//! monitors come and go (docking, remote sessions) while the application
//! runs.

use super::DisplayEnumerator;
use crate::{
    error::CaptureResult,
    model::{DisplayInfo, Point, Rect},
};

/// Monitors attached at the time of one capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTopology {
    displays: Vec<DisplayInfo>,
}

impl DisplayTopology {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        Self { displays }
    }

    /// Asks the platform for the current monitor list
    pub fn enumerate(source: &dyn DisplayEnumerator) -> CaptureResult<Self> {
        let displays = source.displays()?;
        tracing::debug!(display_count = displays.len(), "Enumerated displays");
        Ok(Self::new(displays))
    }

    pub fn displays(&self) -> &[DisplayInfo] {
        &self.displays
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    /// Bounding rectangle of every monitor (the virtual screen)
    pub fn bounds(&self) -> Rect {
        self.displays
            .iter()
            .fold(Rect::default(), |acc, display| acc.bounding_union(&display.bounds))
    }

    /// Monitor containing `point`
    pub fn monitor_containing(&self, point: Point) -> Option<&DisplayInfo> {
        self.displays
            .iter()
            .find(|display| display.bounds.contains_point(point))
    }

    /// Monitor sharing the largest area with `rect`
    pub fn monitor_for_rect(&self, rect: &Rect) -> Option<&DisplayInfo> {
        self.displays
            .iter()
            .filter_map(|display| {
                display
                    .bounds
                    .intersection(rect)
                    .map(|overlap| (overlap.area(), display))
            })
            .max_by_key(|(area, _)| *area)
            .map(|(_, display)| display)
    }

    /// Parts of `rect` lying on each monitor, in enumeration order
    pub fn intersecting(&self, rect: &Rect) -> Vec<Rect> {
        self.displays
            .iter()
            .filter_map(|display| display.bounds.intersection(rect))
            .collect()
    }

    /// True if the monitors together cover every pixel of `rect`
    pub fn covers(&self, rect: &Rect) -> bool {
        if rect.is_empty() {
            return false;
        }
        let mut uncovered = vec![*rect];
        for display in &self.displays {
            uncovered = uncovered
                .iter()
                .flat_map(|piece| piece.subtract(&display.bounds))
                .collect();
            if uncovered.is_empty() {
                return true;
            }
        }
        false
    }

    /// `rect` clipped to the virtual screen
    pub fn clip(&self, rect: &Rect) -> Option<Rect> {
        self.bounds().intersection(rect)
    }
}
