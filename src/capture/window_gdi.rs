//! Window-specific (GDI print) capture
//!
//! The window is asked to render itself into an off-screen surface, so the
//! result is independent of whatever overlaps it on the desktop. Some
//! windows (hardware-accelerated content, certain toolkits) print nothing
//! but black; the quality validator catches those.

use super::{DisplayTopology, ImageBuffer, WindowRenderer};
use crate::model::{Rect, WindowTarget};

/// Virtual-desktop rectangle a window capture should cover
///
/// Client-area-only captures use the client rectangle. A maximized window's
/// resize frame hangs past the edges of its monitor, so maximized windows
/// are clipped to the monitor they are on.
pub fn window_capture_rect(
    window: &WindowTarget,
    client_area_only: bool,
    topology: &DisplayTopology,
) -> Rect {
    let rect = window.capture_bounds(client_area_only);
    if !window.maximized {
        return rect;
    }

    topology
        .monitor_for_rect(&window.bounds)
        .and_then(|display| display.bounds.intersection(&rect))
        .unwrap_or(rect)
}

/// Crops a full-window surface down to `rect`
///
/// Returns `None` when `rect` does not lie within the surface.
pub(crate) fn crop_window_surface(
    surface: ImageBuffer,
    window: &WindowTarget,
    rect: Rect,
) -> Option<ImageBuffer> {
    if rect == window.bounds && surface.dimensions() == (rect.width, rect.height) {
        return Some(surface);
    }

    match surface.crop(rect.relative_to(window.bounds.origin())) {
        Ok(cropped) => Some(cropped),
        Err(error) => {
            tracing::warn!(
                handle = %window.handle,
                %rect,
                error = %error,
                "Window surface does not contain the capture rectangle"
            );
            None
        }
    }
}

/// Captures a window by asking it to print itself
pub struct WindowSpecificCapturer<'a> {
    renderer: Option<&'a dyn WindowRenderer>,
    topology: &'a DisplayTopology,
}

impl<'a> WindowSpecificCapturer<'a> {
    pub fn new(renderer: Option<&'a dyn WindowRenderer>, topology: &'a DisplayTopology) -> Self {
        Self { renderer, topology }
    }

    /// Returns the captured image and the virtual-desktop rectangle it
    /// covers, or `None` if the window declined.
    ///
    /// Platform errors are logged and reported as a decline.
    #[tracing::instrument(skip_all, fields(handle = %window.handle))]
    pub fn capture(
        &self,
        window: &WindowTarget,
        client_area_only: bool,
    ) -> Option<(ImageBuffer, Rect)> {
        let renderer = self.renderer?;

        let surface = match renderer.print_window(window) {
            Ok(Some(surface)) => surface,
            Ok(None) => {
                tracing::debug!("Window declined to print itself");
                return None;
            }
            Err(error) => {
                tracing::warn!(error = %error, "PrintWindow failed, treating as declined");
                return None;
            }
        };

        let rect = window_capture_rect(window, client_area_only, self.topology);
        let image = crop_window_surface(surface, window, rect)?;
        Some((image, rect))
    }
}
