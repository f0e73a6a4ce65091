//! Error types for capture operations
//!
//! Errors fall into three groups:
//!
//! - **Hard failures**: a platform primitive failed after its built-in retry
//!   ([`CaptureError::PlatformCapture`]) or a handle became invalid. These
//!   leave the engine and abort the capture.
//! - **Caller errors**: bad parameters, missing backend, bad configuration.
//! - **Cancellation**: the caller's token fired before the next attempt.
//!
//! Strategy declines (a capturer producing no image) are not errors at all;
//! capturers return `Ok(None)` and the engine moves to the next strategy.

use crate::model::{Rect, WindowHandle};

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Comprehensive error type for capture operations
///
/// Each variant includes detailed context and provides remediation hints
/// through the `remediation_hint()` method.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A platform capture primitive failed
    #[error("Platform call {operation} failed for {rect}: {reason}")]
    PlatformCapture {
        /// Name of the failing platform call (e.g. "BitBlt")
        operation: String,
        /// Rectangle that was being captured
        rect:      Rect,
        /// Platform-supplied reason
        reason:    String,
        /// Whether retrying the same call may succeed
        transient: bool,
    },

    /// The window handle does not refer to a window
    #[error("Invalid window handle {handle}")]
    InvalidHandle {
        /// The offending handle
        handle: WindowHandle,
    },

    /// Target window was closed during capture
    #[error("Target window was closed or became invalid during capture")]
    WindowClosed,

    /// Invalid parameter provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason:    String,
    },

    /// No platform backend exists for this operating system
    #[error("Capture backend '{backend}' is not available on this platform")]
    BackendNotAvailable {
        /// Backend name that's unavailable
        backend: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {reason}")]
    ConfigError {
        /// What is wrong with the configuration
        reason: String,
    },

    /// The caller canceled the capture before the next platform call
    #[error("Capture was canceled")]
    Canceled,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    ImageError(String),

    /// The engine reached a state it does not handle
    #[error("Internal capture error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl CaptureError {
    /// Shorthand for a platform failure
    pub fn platform(
        operation: impl Into<String>,
        rect: Rect,
        reason: impl Into<String>,
        transient: bool,
    ) -> Self {
        CaptureError::PlatformCapture {
            operation: operation.into(),
            rect,
            reason: reason.into(),
            transient,
        }
    }

    /// Whether repeating the same platform call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::PlatformCapture { transient: true, .. })
    }

    /// Returns the rectangle attached to a platform failure, if any
    pub fn rect(&self) -> Option<Rect> {
        match self {
            CaptureError::PlatformCapture { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshot_engine::{error::CaptureError, model::Rect};
    ///
    /// let error = CaptureError::platform("BitBlt", Rect::new(0, 0, 10, 10), "busy", true);
    /// assert!(error.remediation_hint().contains("graphics driver"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::PlatformCapture { .. } => {
                "The desktop could not be copied. This happens on some multi-GPU or remote \
                 desktop setups when the graphics driver is busy. Try the capture again, or \
                 capture a smaller region."
            }
            CaptureError::InvalidHandle { .. } => {
                "The window handle does not belong to an existing window. Enumerate windows \
                 again and retry with a fresh handle."
            }
            CaptureError::WindowClosed => {
                "The target window was closed or destroyed while attempting capture. Ensure the \
                 window remains open during capture, or capture the screen region instead."
            }
            CaptureError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "rect" => "The capture rectangle must have a non-zero width and height.",
                _ => "Check the parameter value against the API documentation.",
            },
            CaptureError::BackendNotAvailable { .. } => {
                "No capture backend exists for this operating system. Use the mock platform for \
                 testing or run on Windows."
            }
            CaptureError::ConfigError { .. } => {
                "Fix the configuration file or the SCREENSHOT_ENGINE_* environment variables and \
                 retry. Unknown keys are ignored, but values must have the right type."
            }
            CaptureError::Canceled => "The capture was canceled; no image was produced.",
            CaptureError::IoError(_) => {
                "An I/O error occurred. Check file permissions, disk space, and system resources."
            }
            CaptureError::ImageError(_) => {
                "Image processing failed. Ensure the image data is valid and the requested \
                 operations are supported."
            }
            CaptureError::Internal { .. } => {
                "The capture engine hit an unexpected state. Retry the capture; if it keeps \
                 failing, run with RUST_LOG=screenshot_engine=debug and report the log."
            }
        }
    }
}
