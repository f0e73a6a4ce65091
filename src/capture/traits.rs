//! Composable platform capability traits
//!
//! The capture engine never talks to the operating system directly. Each
//! platform primitive it needs sits behind one small trait, and a platform
//! implements the traits it can support. The engine holds them through
//! [`PlatformBackend`](super::PlatformBackend); optional capabilities are
//! `Option<Arc<dyn ...>>` there.
//!
//! # Trait Overview
//!
//! - [`DisplayEnumerator`]: monitor layout and system DPI
//! - [`DesktopBlitter`]: block copy of a desktop rectangle
//! - [`WindowOperations`]: window snapshots, restore, foreground, DPI
//! - [`ProcessInspector`]: process name, product name, loaded modules
//! - [`WindowRenderer`]: window-specific (GDI) rendering
//! - [`CompositorSource`]: composited window surfaces
//! - [`CursorSource`]: pointer bitmap and position
//!
//! All methods are blocking. The engine calls them from
//! `tokio::task::spawn_blocking`, one at a time.

use super::ImageBuffer;
use crate::{
    error::CaptureResult,
    model::{CursorSnapshot, DisplayInfo, ProcessInfo, Rect, WindowHandle, WindowTarget},
};

// ============================================================================
// Desktop
// ============================================================================

/// Capability: enumerate monitors.
pub trait DisplayEnumerator: Send + Sync {
    /// Lists every attached monitor in virtual-desktop coordinates.
    ///
    /// Called once per capture; implementations must not cache.
    fn displays(&self) -> CaptureResult<Vec<DisplayInfo>>;

    /// DPI of the primary monitor.
    fn system_dpi(&self) -> u32 {
        96
    }
}

/// Capability: copy pixels straight off the desktop.
pub trait DesktopBlitter: Send + Sync {
    /// Copies `rect` including layered windows.
    ///
    /// Must return an image of exactly `rect`'s size. Errors that a second
    /// attempt may cure are reported with `transient: true`.
    fn blit(&self, rect: Rect) -> CaptureResult<ImageBuffer>;
}

// ============================================================================
// Windows and processes
// ============================================================================

/// Capability: query and manipulate top-level windows.
pub trait WindowOperations: Send + Sync {
    /// Fresh snapshot of the window's state.
    ///
    /// # Errors
    ///
    /// [`CaptureError::InvalidHandle`](crate::error::CaptureError::InvalidHandle)
    /// if the handle does not name a window.
    fn snapshot(&self, handle: WindowHandle) -> CaptureResult<WindowTarget>;

    /// Restores an iconic window.
    fn restore(&self, handle: WindowHandle) -> CaptureResult<()>;

    /// Activates the window and brings it to the top of the z-order.
    fn bring_to_foreground(&self, handle: WindowHandle) -> CaptureResult<()>;

    /// Handle of the active window, if any.
    fn foreground_window(&self) -> CaptureResult<Option<WindowHandle>>;

    /// Effective DPI of the window.
    fn dpi_for_window(&self, handle: WindowHandle) -> CaptureResult<u32>;
}

/// Capability: describe the process owning a window.
pub trait ProcessInspector: Send + Sync {
    fn process_info(&self, pid: u32) -> CaptureResult<ProcessInfo>;

    /// Trims the working set of the calling process.
    fn minimize_working_set(&self) -> CaptureResult<()> {
        Ok(())
    }
}

// ============================================================================
// Window capture primitives
// ============================================================================

/// Capability: ask a window to render itself (GDI print).
pub trait WindowRenderer: Send + Sync {
    /// Renders the whole window (frame included) into a bitmap of
    /// `window.bounds` size.
    ///
    /// `Ok(None)` means the window declined to print.
    fn print_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>>;
}

/// Capability: read composited window surfaces (DWM).
pub trait CompositorSource: Send + Sync {
    /// Whether desktop composition is currently on.
    fn is_enabled(&self) -> bool;

    /// RGBA surface of `window.bounds` size, transparent where the window
    /// has no pixels.
    ///
    /// `Ok(None)` means the compositor has no surface for the window.
    fn capture_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>>;
}

/// Capability: read the pointer.
pub trait CursorSource: Send + Sync {
    /// Current pointer state; `Ok(None)` when no cursor is set.
    fn current_cursor(&self) -> CaptureResult<Option<CursorSnapshot>>;
}
