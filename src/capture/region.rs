//! Raw desktop region capture
//!
//! [`RawRegionCapturer`] turns a virtual-desktop rectangle into a bitmap of
//! exactly that size. Rectangles fully covered by monitors come back as one
//! opaque RGB block copy. Rectangles that hang off every monitor (a window
//! dragged half off-screen, the gap under a shorter second monitor) come back
//! as RGBA, with each monitor's share copied separately and the rest left
//! fully transparent.

use super::{DesktopBlitter, DisplayTopology, ImageBuffer};
use crate::{
    error::{CaptureError, CaptureResult},
    model::Rect,
};

/// Block-copy capturer with retry and off-screen transparency
pub struct RawRegionCapturer<'a> {
    blitter:  &'a dyn DesktopBlitter,
    attempts: u32,
}

impl<'a> RawRegionCapturer<'a> {
    /// `attempts` below one are treated as one
    pub fn new(blitter: &'a dyn DesktopBlitter, attempts: u32) -> Self {
        Self {
            blitter,
            attempts: attempts.max(1),
        }
    }

    /// Captures `rect` against the given monitor layout
    ///
    /// # Errors
    ///
    /// - [`CaptureError::InvalidParameter`] for a zero-area rectangle
    /// - [`CaptureError::PlatformCapture`] once the block copy failed on every
    ///   attempt, or immediately for non-transient failures
    pub fn capture(&self, rect: Rect, topology: &DisplayTopology) -> CaptureResult<ImageBuffer> {
        if rect.is_empty() {
            return Err(CaptureError::InvalidParameter {
                parameter: "rect".to_string(),
                reason:    format!("{} has no area", rect),
            });
        }

        if topology.covers(&rect) {
            let image = self.blit_with_retry(rect)?;
            return Ok(if image.has_alpha() {
                ImageBuffer::from_rgb(image.to_rgb8())
            } else {
                image
            });
        }

        let pieces = topology.intersecting(&rect);
        tracing::debug!(
            %rect,
            visible_pieces = pieces.len(),
            "Region is not fully on screen, compositing onto transparent canvas"
        );

        let mut canvas = ImageBuffer::transparent(rect.width, rect.height);
        for piece in pieces {
            let tile = self.blit_with_retry(piece)?;
            canvas.draw_image(&tile, piece.relative_to(rect.origin()).origin());
        }
        Ok(canvas)
    }

    fn blit_with_retry(&self, rect: Rect) -> CaptureResult<ImageBuffer> {
        let mut attempt = 1;
        loop {
            let error = match self.blitter.blit(rect) {
                Ok(image) if image.dimensions() == (rect.width, rect.height) => return Ok(image),
                Ok(image) => CaptureError::platform(
                    "BitBlt",
                    rect,
                    format!(
                        "copied {}x{} pixels instead of {}x{}",
                        image.width(),
                        image.height(),
                        rect.width,
                        rect.height
                    ),
                    false,
                ),
                Err(error) => error,
            };

            if !error.is_transient() {
                return Err(error);
            }
            if attempt >= self.attempts {
                tracing::warn!(%rect, attempts = attempt, "Block copy failed on every attempt");
                return Err(attach_context(error, rect, attempt));
            }

            tracing::warn!(%rect, attempt, error = %error, "Block copy failed, retrying");
            attempt += 1;
        }
    }
}

fn attach_context(error: CaptureError, rect: Rect, attempts: u32) -> CaptureError {
    match error {
        CaptureError::PlatformCapture {
            operation,
            reason,
            transient,
            ..
        } => CaptureError::PlatformCapture {
            operation,
            rect,
            reason: format!("{reason} (after {attempts} attempts)"),
            transient,
        },
        other => other,
    }
}
