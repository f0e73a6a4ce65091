//! Platform facade holding the capability trait objects
//!
//! [`PlatformBackend`] bundles everything the engine needs from the
//! operating system. Mandatory primitives are plain `Arc`s; the window
//! capture primitives and the cursor are optional so a platform without,
//! say, a compositor simply leaves that field `None` and the engine treats
//! the strategy as declined.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use screenshot_engine::capture::{
//!     composite::platform_from_mock,
//!     mock::{MockPlatform, MockScenario},
//! };
//!
//! let mock = Arc::new(MockPlatform::new(MockScenario::single_display(1920, 1080)));
//! let platform = platform_from_mock(mock);
//!
//! assert_eq!(platform.name, "mock");
//! assert!(platform.has_window_renderer());
//! ```

use std::sync::Arc;

use super::{
    CompositorSource, CursorSource, DesktopBlitter, DisplayEnumerator, ProcessInspector,
    WindowOperations, WindowRenderer,
};
use crate::error::CaptureResult;

/// Platform facade holding capability trait objects.
///
/// # Capabilities
///
/// - `displays`, `blitter`, `windows`, `processes`: always present
/// - `renderer`: window-specific (GDI) rendering
/// - `compositor`: composited surfaces
/// - `cursor`: pointer bitmap
pub struct PlatformBackend {
    /// Monitor enumeration.
    pub displays: Arc<dyn DisplayEnumerator>,

    /// Desktop block copy.
    pub blitter: Arc<dyn DesktopBlitter>,

    /// Window snapshots, restore and activation.
    pub windows: Arc<dyn WindowOperations>,

    /// Owning-process inspection.
    pub processes: Arc<dyn ProcessInspector>,

    /// Window-specific rendering.
    pub renderer: Option<Arc<dyn WindowRenderer>>,

    /// Compositor surfaces.
    ///
    /// Absent on platforms without a compositor; a present source may still
    /// report itself disabled at capture time.
    pub compositor: Option<Arc<dyn CompositorSource>>,

    /// Pointer capture.
    pub cursor: Option<Arc<dyn CursorSource>>,

    /// Backend name for diagnostics.
    pub name: &'static str,
}

impl PlatformBackend {
    /// Returns true if the platform can print windows.
    pub fn has_window_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Returns true if a compositor exists and is currently enabled.
    pub fn compositor_enabled(&self) -> bool {
        self.compositor
            .as_ref()
            .is_some_and(|compositor| compositor.is_enabled())
    }

    /// Returns true if the platform can read the pointer.
    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }
}

impl std::fmt::Debug for PlatformBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformBackend")
            .field("name", &self.name)
            .field("has_renderer", &self.renderer.is_some())
            .field("has_compositor", &self.compositor.is_some())
            .field("has_cursor", &self.cursor.is_some())
            .finish()
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a PlatformBackend from a MockPlatform.
pub fn platform_from_mock(backend: Arc<super::MockPlatform>) -> PlatformBackend {
    PlatformBackend {
        displays:   backend.clone() as Arc<dyn DisplayEnumerator>,
        blitter:    backend.clone() as Arc<dyn DesktopBlitter>,
        windows:    backend.clone() as Arc<dyn WindowOperations>,
        processes:  backend.clone() as Arc<dyn ProcessInspector>,
        renderer:   Some(backend.clone() as Arc<dyn WindowRenderer>),
        compositor: Some(backend.clone() as Arc<dyn CompositorSource>),
        cursor:     Some(backend as Arc<dyn CursorSource>),
        name:       "mock",
    }
}

/// Creates a PlatformBackend for Windows.
#[cfg(target_os = "windows")]
pub fn platform_from_windows(backend: Arc<super::WindowsBackend>) -> PlatformBackend {
    PlatformBackend {
        displays:   backend.clone() as Arc<dyn DisplayEnumerator>,
        blitter:    backend.clone() as Arc<dyn DesktopBlitter>,
        windows:    backend.clone() as Arc<dyn WindowOperations>,
        processes:  backend.clone() as Arc<dyn ProcessInspector>,
        renderer:   Some(backend.clone() as Arc<dyn WindowRenderer>),
        compositor: Some(backend.clone() as Arc<dyn CompositorSource>),
        cursor:     Some(backend as Arc<dyn CursorSource>),
        name:       "windows",
    }
}

/// Creates the PlatformBackend for the current operating system.
///
/// # Errors
///
/// [`CaptureError::BackendNotAvailable`](crate::error::CaptureError::BackendNotAvailable)
/// on anything but Windows.
pub fn default_platform() -> CaptureResult<PlatformBackend> {
    #[cfg(target_os = "windows")]
    {
        let backend = Arc::new(super::WindowsBackend::new()?);
        Ok(platform_from_windows(backend))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(crate::error::CaptureError::BackendNotAvailable {
            backend: std::env::consts::OS.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capture::mock::{MockPlatform, MockScenario},
        error::CaptureError,
    };

    #[test]
    fn test_platform_from_mock_has_all_capabilities() {
        let mock = Arc::new(MockPlatform::new(MockScenario::single_display(800, 600)));
        let platform = platform_from_mock(mock);

        assert!(platform.has_window_renderer());
        assert!(platform.has_cursor());
        assert!(!platform.compositor_enabled());
    }

    #[test]
    fn test_compositor_enabled_follows_source() {
        let mock = Arc::new(MockPlatform::new(
            MockScenario::single_display(800, 600).with_compositor(true),
        ));
        let platform = platform_from_mock(mock);
        assert!(platform.compositor_enabled());
    }

    #[test]
    fn test_missing_compositor_is_disabled() {
        let mock = Arc::new(MockPlatform::new(
            MockScenario::single_display(800, 600).with_compositor(true),
        ));
        let mut platform = platform_from_mock(mock);
        platform.compositor = None;
        assert!(!platform.compositor_enabled());
    }

    #[test]
    fn test_debug_format() {
        let mock = Arc::new(MockPlatform::new(MockScenario::single_display(800, 600)));
        let debug = format!("{:?}", platform_from_mock(mock));
        assert!(debug.contains("mock"));
        assert!(debug.contains("has_compositor"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_default_platform_unavailable() {
        let result = default_platform();
        assert!(matches!(result, Err(CaptureError::BackendNotAvailable { .. })));
    }
}
