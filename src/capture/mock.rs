//! Mock platform for testing
//!
//! This module provides a [`MockPlatform`] implementing every platform
//! capability trait against a simulated desktop described by a
//! [`MockScenario`]. Scenarios are plain serde data, so the same description
//! drives unit tests, integration tests and the `capture-probe` binary.
//!
//! # Features
//!
//! - **Simulated desktop:** monitors at arbitrary virtual-desktop positions;
//!   block copies return a coordinate-dependent pattern that is never black
//! - **Scripted windows:** per-window GDI and compositor responses (decline,
//!   a synthetic surface, or a platform error)
//! - **Window state:** restore and foreground switches mutate the simulated
//!   window, so re-queried snapshots see the change
//! - **Failure injection:** transient or permanent block-copy failures, an
//!   unreadable cursor
//! - **Call log:** every platform call is recorded for spying in tests
//!
//! # Examples
//!
//! ```
//! use screenshot_engine::{
//!     capture::{
//!         DesktopBlitter,
//!         mock::{MockCall, MockPlatform, MockScenario},
//!     },
//!     model::Rect,
//! };
//!
//! let mock = MockPlatform::new(MockScenario::single_display(1920, 1080));
//! let image = mock.blit(Rect::new(0, 0, 100, 50)).unwrap();
//!
//! assert_eq!(image.dimensions(), (100, 50));
//! assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 1);
//! ```

use std::{
    path::Path,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{
    CompositorSource, CursorSource, DesktopBlitter, DisplayEnumerator, ImageBuffer,
    ProcessInspector, WindowOperations, WindowRenderer,
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::{CursorSnapshot, DisplayInfo, Point, ProcessInfo, Rect, WindowHandle, WindowTarget},
};

/// Position Windows parks minimized windows at
const ICONIC_POSITION: i32 = -32000;

// ============================================================================
// Scenario description
// ============================================================================

/// Synthetic pixels a window surface is filled with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MockSurface {
    /// Opaque blue-to-cyan gradient, no black pixels
    Pattern,
    /// Opaque single colour
    Solid { rgb: [u8; 3] },
    /// The first `percent`% of pixels (row-major) are solid black, the rest
    /// light grey
    Black { percent: f64 },
    /// Gradient surrounded by a fully transparent border
    Bordered { border: u32 },
}

impl MockSurface {
    fn render(&self, width: u32, height: u32) -> ImageBuffer {
        match self {
            MockSurface::Pattern => ImageBuffer::from_test_pattern(width, height),
            MockSurface::Solid { rgb } => ImageBuffer::solid(width, height, *rgb),
            MockSurface::Black { percent } => {
                let total = u64::from(width) * u64::from(height);
                let black = (total as f64 * percent.clamp(0.0, 100.0) / 100.0).round() as u64;
                ImageBuffer::from_rgb(RgbImage::from_fn(width, height, |x, y| {
                    let index = u64::from(y) * u64::from(width) + u64::from(x);
                    if index < black {
                        image::Rgb([0, 0, 0])
                    } else {
                        image::Rgb([210, 210, 210])
                    }
                }))
            }
            MockSurface::Bordered { border } => {
                let mut canvas = ImageBuffer::transparent(width, height);
                let inner_width = width.saturating_sub(2 * border);
                let inner_height = height.saturating_sub(2 * border);
                if inner_width > 0 && inner_height > 0 {
                    canvas.draw_image(
                        &ImageBuffer::from_test_pattern(inner_width, inner_height),
                        Point::new(*border as i32, *border as i32),
                    );
                }
                canvas
            }
        }
    }
}

/// How a window answers one capture primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum MockResponse {
    /// `Ok(None)`
    Declined,
    /// `Ok(Some(surface))` sized to the window bounds
    Surface(MockSurface),
    /// A non-transient platform error with this reason
    Error(String),
}

fn default_gdi_response() -> MockResponse {
    MockResponse::Surface(MockSurface::Pattern)
}

fn default_compositor_response() -> MockResponse {
    MockResponse::Declined
}

/// A simulated top-level window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockWindow {
    #[serde(flatten)]
    pub target:          WindowTarget,
    /// Bounds after a restore; only meaningful for minimized windows
    #[serde(default)]
    pub restored_bounds:        Option<Rect>,
    /// Client area after a restore; the restored bounds when unset
    #[serde(default)]
    pub restored_client_bounds: Option<Rect>,
    #[serde(default = "default_gdi_response")]
    pub gdi:                    MockResponse,
    #[serde(default = "default_compositor_response")]
    pub compositor:             MockResponse,
    /// Per-window DPI; the system DPI when unset
    #[serde(default)]
    pub dpi:                    Option<u32>,
}

impl MockWindow {
    /// Visible, normal window whose client area equals its bounds
    pub fn new(handle: u64, bounds: Rect, process_id: u32) -> Self {
        Self {
            target:          WindowTarget {
                handle: WindowHandle(handle),
                bounds,
                client_bounds: bounds,
                minimized: false,
                maximized: false,
                visible: true,
                process_id,
                is_modern_app: false,
                title: format!("Mock window {handle:#x}"),
                class_name: "MockWindowClass".to_string(),
            },
            restored_bounds:        None,
            restored_client_bounds: None,
            gdi:                    default_gdi_response(),
            compositor:             default_compositor_response(),
            dpi:                    None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.target.title = title.into();
        self
    }

    pub fn with_client(mut self, client: Rect) -> Self {
        self.target.client_bounds = client;
        self
    }

    /// Parks the window iconic; a restore moves it back to its current
    /// bounds and client area
    pub fn minimized(mut self) -> Self {
        self.restored_bounds = Some(self.target.bounds);
        self.restored_client_bounds = Some(self.target.client_bounds);
        self.target.bounds = Rect::new(ICONIC_POSITION, ICONIC_POSITION, 160, 28);
        self.target.client_bounds = Rect::new(ICONIC_POSITION, ICONIC_POSITION, 0, 0);
        self.target.minimized = true;
        self
    }

    pub fn maximized(mut self) -> Self {
        self.target.maximized = true;
        self
    }

    /// Marks the window as hosted by the modern app shell
    pub fn modern(mut self) -> Self {
        self.target.is_modern_app = true;
        self
    }

    pub fn with_gdi(mut self, response: MockResponse) -> Self {
        self.gdi = response;
        self
    }

    pub fn with_compositor(mut self, response: MockResponse) -> Self {
        self.compositor = response;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }
}

/// Simulated pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockCursor {
    pub position: Point,
    #[serde(default)]
    pub hotspot:  Point,
    #[serde(default = "default_true")]
    pub showing:  bool,
    /// Square bitmap edge length
    #[serde(default = "default_cursor_size")]
    pub size:     u32,
    /// Reading the cursor fails
    #[serde(default)]
    pub fail:     bool,
}

impl MockCursor {
    pub fn new(position: Point, hotspot: Point, showing: bool) -> Self {
        Self {
            position,
            hotspot,
            showing,
            size: default_cursor_size(),
            fail: false,
        }
    }

    /// A cursor whose every read fails
    pub fn unreadable() -> Self {
        Self {
            fail: true,
            ..Self::new(Point::default(), Point::default(), true)
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cursor_size() -> u32 {
    32
}

fn default_system_dpi() -> u32 {
    96
}

fn default_displays() -> Vec<DisplayInfo> {
    vec![DisplayInfo::new(Rect::new(0, 0, 1920, 1080), r"\\.\DISPLAY1", true)]
}

/// Complete description of a simulated desktop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockScenario {
    #[serde(default = "default_displays")]
    pub displays:                Vec<DisplayInfo>,
    #[serde(default)]
    pub windows:                 Vec<MockWindow>,
    /// Known processes; unknown pids get a generated name
    #[serde(default)]
    pub processes:               Vec<ProcessInfo>,
    #[serde(default)]
    pub compositor_enabled:      bool,
    #[serde(default)]
    pub cursor:                  Option<MockCursor>,
    #[serde(default)]
    pub foreground:              Option<WindowHandle>,
    /// Block copies failing transiently before the first success
    #[serde(default)]
    pub transient_blit_failures: u32,
    /// Every block copy fails permanently with this reason
    #[serde(default)]
    pub blit_error:              Option<String>,
    #[serde(default = "default_system_dpi")]
    pub system_dpi:              u32,
}

impl Default for MockScenario {
    fn default() -> Self {
        Self {
            displays:                default_displays(),
            windows:                 Vec::new(),
            processes:               Vec::new(),
            compositor_enabled:      false,
            cursor:                  None,
            foreground:              None,
            transient_blit_failures: 0,
            blit_error:              None,
            system_dpi:              default_system_dpi(),
        }
    }
}

impl MockScenario {
    /// One primary monitor at the virtual-desktop origin
    pub fn single_display(width: u32, height: u32) -> Self {
        Self {
            displays: vec![DisplayInfo::new(Rect::new(0, 0, width, height), r"\\.\DISPLAY1", true)],
            ..Self::default()
        }
    }

    /// Parses a scenario from JSON
    pub fn from_json(json: &str) -> CaptureResult<Self> {
        serde_json::from_str(json).map_err(|e| CaptureError::InvalidParameter {
            parameter: "scenario".to_string(),
            reason:    e.to_string(),
        })
    }

    /// Loads a scenario from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> CaptureResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn with_display(mut self, bounds: Rect) -> Self {
        let name = format!(r"\\.\DISPLAY{}", self.displays.len() + 1);
        self.displays.push(DisplayInfo::new(bounds, name, false));
        self
    }

    pub fn with_window(mut self, window: MockWindow) -> Self {
        self.windows.push(window);
        self
    }

    pub fn with_process(mut self, process: ProcessInfo) -> Self {
        self.processes.push(process);
        self
    }

    pub fn with_compositor(mut self, enabled: bool) -> Self {
        self.compositor_enabled = enabled;
        self
    }

    pub fn with_cursor(mut self, cursor: MockCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_foreground(mut self, handle: WindowHandle) -> Self {
        self.foreground = Some(handle);
        self
    }

    pub fn with_transient_blit_failures(mut self, failures: u32) -> Self {
        self.transient_blit_failures = failures;
        self
    }

    pub fn with_blit_error(mut self, reason: impl Into<String>) -> Self {
        self.blit_error = Some(reason.into());
        self
    }
}

// ============================================================================
// Platform
// ============================================================================

/// One recorded platform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Displays,
    Blit(Rect),
    Snapshot(WindowHandle),
    Restore(WindowHandle),
    BringToForeground(WindowHandle),
    ForegroundWindow,
    DpiForWindow(WindowHandle),
    ProcessInfo(u32),
    MinimizeWorkingSet,
    PrintWindow(WindowHandle),
    CompositorCapture(WindowHandle),
    Cursor,
}

#[derive(Debug)]
struct MockState {
    displays:           Vec<DisplayInfo>,
    windows:            Vec<MockWindow>,
    foreground:         Option<WindowHandle>,
    blit_failures_left: u32,
    calls:              Vec<MockCall>,
}

/// Simulated platform implementing every capability trait
///
/// Thread-safe; share it through `Arc` and hand it to
/// [`platform_from_mock`](super::composite::platform_from_mock).
#[derive(Debug)]
pub struct MockPlatform {
    scenario:           MockScenario,
    compositor_enabled: AtomicBool,
    state:              Mutex<MockState>,
}

impl MockPlatform {
    pub fn new(scenario: MockScenario) -> Self {
        let state = MockState {
            displays:           scenario.displays.clone(),
            windows:            scenario.windows.clone(),
            foreground:         scenario.foreground,
            blit_failures_left: scenario.transient_blit_failures,
            calls:              Vec::new(),
        };
        Self {
            compositor_enabled: AtomicBool::new(scenario.compositor_enabled),
            scenario,
            state: Mutex::new(state),
        }
    }

    /// Pixels the simulated desktop shows inside `rect`
    ///
    /// Depends only on virtual-desktop coordinates, so two copies of
    /// overlapping rectangles agree on their overlap.
    pub fn desktop_pattern(rect: Rect) -> ImageBuffer {
        ImageBuffer::from_rgb(RgbImage::from_fn(rect.width, rect.height, |x, y| {
            let vx = i64::from(rect.x) + i64::from(x);
            let vy = i64::from(rect.y) + i64::from(y);
            image::Rgb([
                (vx.rem_euclid(200) + 30) as u8,
                (vy.rem_euclid(200) + 30) as u8,
                90,
            ])
        }))
    }

    /// Every call recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn call_count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current simulated state of a window
    pub fn window(&self, handle: WindowHandle) -> Option<WindowTarget> {
        self.state()
            .windows
            .iter()
            .find(|window| window.target.handle == handle)
            .map(|window| window.target.clone())
    }

    pub fn set_compositor_enabled(&self, enabled: bool) {
        self.compositor_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Replaces the monitor layout, as if a display was plugged or unplugged
    pub fn set_displays(&self, displays: Vec<DisplayInfo>) {
        self.state().displays = displays;
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }

    fn find_window(&self, handle: WindowHandle) -> CaptureResult<MockWindow> {
        self.state()
            .windows
            .iter()
            .find(|window| window.target.handle == handle)
            .cloned()
            .ok_or(CaptureError::InvalidHandle { handle })
    }

    fn respond(
        response: &MockResponse,
        operation: &str,
        window: &WindowTarget,
    ) -> CaptureResult<Option<ImageBuffer>> {
        match response {
            MockResponse::Declined => Ok(None),
            MockResponse::Surface(surface) => {
                Ok(Some(surface.render(window.bounds.width, window.bounds.height)))
            }
            MockResponse::Error(reason) => Err(CaptureError::platform(
                operation,
                window.bounds,
                reason.clone(),
                false,
            )),
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(MockScenario::default())
    }
}

impl DisplayEnumerator for MockPlatform {
    fn displays(&self) -> CaptureResult<Vec<DisplayInfo>> {
        self.record(MockCall::Displays);
        Ok(self.state().displays.clone())
    }

    fn system_dpi(&self) -> u32 {
        self.scenario.system_dpi
    }
}

impl DesktopBlitter for MockPlatform {
    fn blit(&self, rect: Rect) -> CaptureResult<ImageBuffer> {
        self.record(MockCall::Blit(rect));

        if let Some(reason) = &self.scenario.blit_error {
            return Err(CaptureError::platform("BitBlt", rect, reason.clone(), false));
        }

        {
            let mut state = self.state();
            if state.blit_failures_left > 0 {
                state.blit_failures_left -= 1;
                return Err(CaptureError::platform(
                    "CreateDIBSection",
                    rect,
                    "simulated transient failure",
                    true,
                ));
            }
        }

        Ok(Self::desktop_pattern(rect))
    }
}

impl WindowOperations for MockPlatform {
    fn snapshot(&self, handle: WindowHandle) -> CaptureResult<WindowTarget> {
        self.record(MockCall::Snapshot(handle));
        self.find_window(handle).map(|window| window.target)
    }

    fn restore(&self, handle: WindowHandle) -> CaptureResult<()> {
        self.record(MockCall::Restore(handle));
        let mut state = self.state();
        let window = state
            .windows
            .iter_mut()
            .find(|window| window.target.handle == handle)
            .ok_or(CaptureError::InvalidHandle { handle })?;

        if window.target.minimized {
            let restored = window.restored_bounds.unwrap_or(window.target.bounds);
            window.target.minimized = false;
            window.target.bounds = restored;
            window.target.client_bounds = window.restored_client_bounds.unwrap_or(restored);
        }
        state.foreground = Some(handle);
        Ok(())
    }

    fn bring_to_foreground(&self, handle: WindowHandle) -> CaptureResult<()> {
        self.record(MockCall::BringToForeground(handle));
        let mut state = self.state();
        if !state.windows.iter().any(|window| window.target.handle == handle) {
            return Err(CaptureError::InvalidHandle { handle });
        }
        state.foreground = Some(handle);
        Ok(())
    }

    fn foreground_window(&self) -> CaptureResult<Option<WindowHandle>> {
        self.record(MockCall::ForegroundWindow);
        Ok(self.state().foreground)
    }

    fn dpi_for_window(&self, handle: WindowHandle) -> CaptureResult<u32> {
        self.record(MockCall::DpiForWindow(handle));
        let window = self.find_window(handle)?;
        Ok(window.dpi.unwrap_or(self.scenario.system_dpi))
    }
}

impl ProcessInspector for MockPlatform {
    fn process_info(&self, pid: u32) -> CaptureResult<ProcessInfo> {
        self.record(MockCall::ProcessInfo(pid));
        Ok(self
            .scenario
            .processes
            .iter()
            .find(|process| process.pid == pid)
            .cloned()
            .unwrap_or_else(|| ProcessInfo {
                pid,
                name: format!("process-{pid}.exe"),
                product_name: None,
                modules: Vec::new(),
            }))
    }

    fn minimize_working_set(&self) -> CaptureResult<()> {
        self.record(MockCall::MinimizeWorkingSet);
        Ok(())
    }
}

impl WindowRenderer for MockPlatform {
    fn print_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>> {
        self.record(MockCall::PrintWindow(window.handle));
        let mock = self.find_window(window.handle)?;
        Self::respond(&mock.gdi, "PrintWindow", &mock.target)
    }
}

impl CompositorSource for MockPlatform {
    fn is_enabled(&self) -> bool {
        self.compositor_enabled.load(Ordering::SeqCst)
    }

    fn capture_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>> {
        self.record(MockCall::CompositorCapture(window.handle));
        let mock = self.find_window(window.handle)?;
        if mock.target.minimized {
            return Ok(None);
        }
        Ok(Self::respond(&mock.compositor, "DwmCapture", &mock.target)?
            .map(|surface| ImageBuffer::from_rgba(surface.to_rgba8())))
    }
}

impl CursorSource for MockPlatform {
    fn current_cursor(&self) -> CaptureResult<Option<CursorSnapshot>> {
        self.record(MockCall::Cursor);
        let Some(cursor) = &self.scenario.cursor else {
            return Ok(None);
        };
        if cursor.fail {
            return Err(CaptureError::platform(
                "GetCursorInfo",
                Rect::default(),
                "simulated cursor failure",
                false,
            ));
        }
        Ok(Some(CursorSnapshot {
            image:           ImageBuffer::from_rgba(RgbaImage::from_pixel(
                cursor.size,
                cursor.size,
                image::Rgba([255, 0, 255, 255]),
            )),
            hotspot:         cursor.hotspot,
            screen_position: cursor.position,
            showing:         cursor.showing,
        }))
    }
}
