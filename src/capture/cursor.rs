//! Pointer overlay
//!
//! The pointer is captured separately from the desktop and positioned
//! relative to the capture origin, so the caller decides whether to
//! composite it (see [`Capture::composite_cursor`](super::Capture::composite_cursor)).

use super::{CursorOverlay, CursorSource};
use crate::model::Point;

/// Reads the pointer and places it relative to a capture origin
pub struct CursorOverlayCapturer<'a> {
    source: &'a dyn CursorSource,
}

impl<'a> CursorOverlayCapturer<'a> {
    pub fn new(source: &'a dyn CursorSource) -> Self {
        Self { source }
    }

    /// Returns an overlay for a capture whose top-left is `origin`
    ///
    /// `None` when the pointer is hidden, unset or unreadable.
    pub fn capture(&self, origin: Point) -> Option<CursorOverlay> {
        let snapshot = match self.source.current_cursor() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(error = %error, "Could not read cursor, skipping overlay");
                return None;
            }
        };

        if !snapshot.showing {
            tracing::debug!("Cursor is hidden");
            return None;
        }

        let location = snapshot
            .screen_position
            .offset_from(origin)
            .offset_from(snapshot.hotspot);

        Some(CursorOverlay {
            image: snapshot.image,
            location,
            visible: true,
        })
    }
}
