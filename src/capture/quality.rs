//! Quality check for window-specific captures
//!
//! Windows that render through the GPU often print as a solid black
//! rectangle. When that happens the pixels are usually still visible on the
//! desktop, so a plain screen copy of the same area is the better result.
//! [`CaptureQualityValidator`] compares the two by their share of solid-black
//! pixels and only pays for the screen copy when the GDI capture looks
//! suspicious.

use serde::Serialize;

use super::{
    ImageBuffer,
    constants::{CROPPED_SCREEN_BLACK_PERCENT, TRUSTED_BLACK_PERCENT},
};

/// Which candidate the validator kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityVerdict {
    /// Below the trust threshold; the screen copy was never taken
    TrustedGdi,
    KeepGdi,
    UseScreen,
}

/// Outcome of one validation
#[derive(Debug, Clone)]
pub struct QualityDecision {
    /// The image that won
    pub image:                ImageBuffer,
    pub verdict:              QualityVerdict,
    pub gdi_black_percent:    f64,
    /// `None` when the screen copy was skipped or unavailable
    pub screen_black_percent: Option<f64>,
}

/// Chooses between a GDI capture and a screen copy of the same window
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureQualityValidator;

impl CaptureQualityValidator {
    /// Picks the less suspicious of `gdi` and the lazily produced screen
    /// copy.
    ///
    /// `screen` is only invoked when the GDI capture is at least
    /// [`TRUSTED_BLACK_PERCENT`] black. It returns `None` if no screen copy
    /// could be made, in which case the GDI capture is kept.
    pub fn choose<F>(&self, gdi: ImageBuffer, screen: F) -> QualityDecision
    where
        F: FnOnce() -> Option<ImageBuffer>,
    {
        let gdi_black_percent = gdi.black_percentage();
        if gdi_black_percent < TRUSTED_BLACK_PERCENT {
            tracing::debug!(gdi_black_percent, "GDI capture trusted");
            return QualityDecision {
                image: gdi,
                verdict: QualityVerdict::TrustedGdi,
                gdi_black_percent,
                screen_black_percent: None,
            };
        }

        let Some(screen) = screen() else {
            tracing::debug!(gdi_black_percent, "No screen candidate, keeping GDI capture");
            return QualityDecision {
                image: gdi,
                verdict: QualityVerdict::KeepGdi,
                gdi_black_percent,
                screen_black_percent: None,
            };
        };

        let screen_black_percent = screen.black_percentage();
        let gdi_pixels = gdi.pixel_count();
        let screen_pixels = screen.pixel_count();

        let use_screen = if screen_pixels == gdi_pixels {
            screen_black_percent < gdi_black_percent
        } else if screen_pixels < gdi_pixels {
            gdi_black_percent > CROPPED_SCREEN_BLACK_PERCENT
                && gdi_black_percent > screen_black_percent
        } else {
            false
        };

        tracing::debug!(
            gdi_black_percent,
            screen_black_percent,
            gdi_pixels,
            screen_pixels,
            use_screen,
            "Compared GDI capture with screen copy"
        );

        if use_screen {
            QualityDecision {
                image: screen,
                verdict: QualityVerdict::UseScreen,
                gdi_black_percent,
                screen_black_percent: Some(screen_black_percent),
            }
        } else {
            QualityDecision {
                image: gdi,
                verdict: QualityVerdict::KeepGdi,
                gdi_black_percent,
                screen_black_percent: Some(screen_black_percent),
            }
        }
    }
}
