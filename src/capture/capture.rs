//! The capture value handed back to the caller
//!
//! A [`Capture`] starts empty, is populated by exactly one capturer, may be
//! cropped or get the cursor composited in, and is then owned by whoever
//! asked for it.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::ImageBuffer;
use crate::{
    error::{CaptureError, CaptureResult},
    model::{CaptureMode, Point, Rect},
};

/// Metadata travelling with a capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDetails {
    /// Human readable title (window caption or region description)
    pub title:        String,
    /// Strategy that produced the bitmap
    pub mode:         CaptureMode,
    /// Ordered key/value metadata
    pub metadata:     BTreeMap<String, String>,
    /// Horizontal DPI of the captured surface
    pub dpi_x:        f32,
    /// Vertical DPI of the captured surface
    pub dpi_y:        f32,
    /// Destination designators; routed by the caller, never interpreted here
    pub destinations: Vec<String>,
    /// When the capture finished
    pub captured_at:  DateTime<Local>,
}

impl Default for CaptureDetails {
    fn default() -> Self {
        Self {
            title:        String::new(),
            mode:         CaptureMode::Auto,
            metadata:     BTreeMap::new(),
            dpi_x:        super::constants::DEFAULT_DPI,
            dpi_y:        super::constants::DEFAULT_DPI,
            destinations: Vec::new(),
            captured_at:  Local::now(),
        }
    }
}

impl CaptureDetails {
    /// Inserts or replaces a metadata entry
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

/// Pointer bitmap positioned relative to the capture origin
#[derive(Debug, Clone)]
pub struct CursorOverlay {
    pub image:    ImageBuffer,
    /// Top-left of the cursor bitmap inside the capture
    pub location: Point,
    pub visible:  bool,
}

/// A captured bitmap with its placement and details
#[derive(Debug, Clone, Default)]
pub struct Capture {
    image:   Option<ImageBuffer>,
    origin:  Point,
    cursor:  Option<CursorOverlay>,
    details: CaptureDetails,
}

impl Capture {
    /// Creates an empty capture
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capture holding `image` placed at `origin`
    pub fn with_image(image: ImageBuffer, origin: Point) -> Self {
        let mut capture = Self::new();
        capture.set_image(image, origin);
        capture
    }

    /// Replaces the bitmap and its origin
    ///
    /// The previous bitmap is dropped before the new one is stored.
    pub fn set_image(&mut self, image: ImageBuffer, origin: Point) {
        if let Some(previous) = self.image.take() {
            tracing::trace!(
                width = previous.width(),
                height = previous.height(),
                "Releasing replaced capture bitmap"
            );
            drop(previous);
        }
        self.image = Some(image);
        self.origin = origin;
    }

    /// The bitmap, if a capturer produced one
    pub fn image(&self) -> Option<&ImageBuffer> {
        self.image.as_ref()
    }

    /// Takes the bitmap out, leaving the capture empty
    pub fn take_image(&mut self) -> Option<ImageBuffer> {
        self.image.take()
    }

    /// Top-left of the bitmap in virtual-desktop coordinates
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Virtual-desktop rectangle covered by the bitmap
    pub fn bounds(&self) -> Rect {
        let (width, height) = self.image.as_ref().map(ImageBuffer::dimensions).unwrap_or((0, 0));
        Rect::new(self.origin.x, self.origin.y, width, height)
    }

    pub fn cursor(&self) -> Option<&CursorOverlay> {
        self.cursor.as_ref()
    }

    pub fn set_cursor(&mut self, cursor: Option<CursorOverlay>) {
        self.cursor = cursor;
    }

    pub fn details(&self) -> &CaptureDetails {
        &self.details
    }

    pub fn details_mut(&mut self) -> &mut CaptureDetails {
        &mut self.details
    }

    /// Crops to a virtual-desktop rectangle
    ///
    /// The rectangle must lie inside [`bounds`](Self::bounds). The origin and
    /// the cursor location move with the crop.
    pub fn crop(&mut self, rect: Rect) -> CaptureResult<()> {
        let Some(image) = self.image.as_ref() else {
            return Err(CaptureError::InvalidParameter {
                parameter: "rect".to_string(),
                reason:    "capture has no image to crop".to_string(),
            });
        };

        let local = rect.relative_to(self.origin);
        let cropped = image.crop(local)?;
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.location = cursor.location.offset_from(local.origin());
        }
        self.set_image(cropped, rect.origin());
        Ok(())
    }

    /// Alpha-blends a visible cursor overlay into the bitmap
    ///
    /// The overlay is consumed. Invisible overlays are discarded.
    pub fn composite_cursor(&mut self) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };
        if !cursor.visible {
            return;
        }
        if let Some(image) = self.image.as_mut() {
            image.overlay(&cursor.image, cursor.location);
        }
    }
}
