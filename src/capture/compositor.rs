//! Compositor (DWM) capture
//!
//! The compositor keeps an off-screen surface for every top-level window, so
//! this path works for occluded windows and for content GDI cannot print.
//! The surface carries an alpha channel: rounded corners, drop shadows and
//! glass frames are partially or fully transparent.

use super::{
    CompositorSource, DisplayTopology, ImageBuffer,
    window_gdi::{crop_window_surface, window_capture_rect},
};
use crate::model::{CaptureMode, Point, Rect, WindowTarget};

/// What to do with the surface's transparency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositorOptions {
    /// Strip fully transparent rows and columns around the window
    pub trim_border: bool,
    /// Keep the alpha channel instead of flattening
    pub keep_alpha:  bool,
    /// Colour transparent pixels are flattened onto
    pub background:  [u8; 3],
}

impl CompositorOptions {
    /// Options for a compositor attempt
    ///
    /// - chosen by the auto resolver: trim the border, flatten
    /// - explicit [`CaptureMode::Compositor`]: keep the border, flatten
    /// - explicit [`CaptureMode::CompositorTransparent`]: keep border and alpha
    pub fn for_mode(mode: CaptureMode, from_auto: bool, background: [u8; 3]) -> Self {
        let keep_alpha = mode == CaptureMode::CompositorTransparent && !from_auto;
        Self {
            trim_border: from_auto,
            keep_alpha,
            background,
        }
    }
}

/// Captures a window's composited surface
pub struct CompositorCapturer<'a> {
    source:   Option<&'a dyn CompositorSource>,
    topology: &'a DisplayTopology,
}

impl<'a> CompositorCapturer<'a> {
    pub fn new(source: Option<&'a dyn CompositorSource>, topology: &'a DisplayTopology) -> Self {
        Self { source, topology }
    }

    /// Returns the processed image and the virtual-desktop rectangle it
    /// covers, or `None` if the compositor declined.
    ///
    /// Platform errors are logged and reported as a decline.
    #[tracing::instrument(skip_all, fields(handle = %window.handle))]
    pub fn capture(
        &self,
        window: &WindowTarget,
        client_area_only: bool,
        options: CompositorOptions,
    ) -> Option<(ImageBuffer, Rect)> {
        let source = self.source?;
        if !source.is_enabled() {
            tracing::debug!("Compositor is disabled");
            return None;
        }

        let surface = match source.capture_window(window) {
            Ok(Some(surface)) => surface,
            Ok(None) => {
                tracing::debug!("Compositor has no surface for window");
                return None;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Compositor capture failed, treating as declined");
                return None;
            }
        };

        let mut rect = window_capture_rect(window, client_area_only, self.topology);
        let mut image = crop_window_surface(surface, window, rect)?;

        if options.trim_border {
            let (trimmed, offset) = image.trim_transparent_border();
            if offset != Point::default() || trimmed.dimensions() != image.dimensions() {
                rect = Rect::new(
                    rect.x + offset.x,
                    rect.y + offset.y,
                    trimmed.width(),
                    trimmed.height(),
                );
                tracing::debug!(%rect, "Trimmed transparent border");
            }
            image = trimmed;
        }

        if !options.keep_alpha {
            image = image.flatten_onto(options.background);
        }

        Some((image, rect))
    }
}
