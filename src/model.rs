//! Data models and type definitions for screenshot-engine
//!
//! This module defines the plain value types shared by every capturer:
//! - Virtual-desktop geometry (`Point`, `Rect`)
//! - Window and display snapshots (`WindowTarget`, `DisplayInfo`)
//! - Capture modes, targets and requests
//! - Process and cursor descriptions returned by the platform layer
//!
//! All coordinates are in virtual-desktop pixels. The virtual desktop origin
//! is the top-left of the primary monitor, so secondary monitors may have
//! negative coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::ImageBuffer;

/// A point in virtual-desktop coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Creates a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns `self - other` component-wise
    pub const fn offset_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle in virtual-desktop coordinates
///
/// `x`/`y` is the top-left corner; the right and bottom edges are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x:      i32,
    pub y:      i32,
    pub width:  u32,
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from its exclusive edges, clamping inverted edges
    /// to an empty rectangle
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        let width = (i64::from(right) - i64::from(left)).max(0) as u32;
        let height = (i64::from(bottom) - i64::from(top)).max(0) as u32;
        Self::new(left, top, width, height)
    }

    /// Top-left corner
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        (i64::from(self.x) + i64::from(self.width)).min(i64::from(i32::MAX)) as i32
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        (i64::from(self.y) + i64::from(self.height)).min(i64::from(i32::MAX)) as i32
    }

    /// Center point (rounded towards the top-left)
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns true if the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if `point` lies inside the rectangle
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Returns true if `other` lies fully inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection of two rectangles, `None` if they do not overlap
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > left && bottom > top {
            Some(Rect::from_edges(left, top, right, bottom))
        } else {
            None
        }
    }

    /// Returns true if the rectangles share at least one pixel
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Smallest rectangle containing both
    pub fn bounding_union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Returns `self` expressed relative to `origin`
    pub fn relative_to(&self, origin: Point) -> Rect {
        Rect::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }

    /// Splits `self - hole` into at most four disjoint rectangles
    pub fn subtract(&self, hole: &Rect) -> Vec<Rect> {
        let Some(cut) = self.intersection(hole) else {
            return vec![*self];
        };

        let mut pieces = Vec::with_capacity(4);
        // Band above the hole
        if cut.y > self.y {
            pieces.push(Rect::from_edges(self.x, self.y, self.right(), cut.y));
        }
        // Band below the hole
        if cut.bottom() < self.bottom() {
            pieces.push(Rect::from_edges(self.x, cut.bottom(), self.right(), self.bottom()));
        }
        // Left and right of the hole, limited to the hole's rows
        if cut.x > self.x {
            pieces.push(Rect::from_edges(self.x, cut.y, cut.x, cut.bottom()));
        }
        if cut.right() < self.right() {
            pieces.push(Rect::from_edges(cut.right(), cut.y, self.right(), cut.bottom()));
        }
        pieces
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Opaque native window identifier
///
/// On Windows this is the `HWND` value. The mock platform uses small
/// integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    /// Returns the raw handle value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Immutable snapshot of a top-level window
///
/// Never mutated in place: after any operation that can change window state
/// (restore, foreground switch) the engine asks the platform for a fresh
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTarget {
    /// Native handle
    pub handle:        WindowHandle,
    /// Window rectangle including the non-client frame
    pub bounds:        Rect,
    /// Client area rectangle, in virtual-desktop coordinates
    pub client_bounds: Rect,
    /// Window is iconic
    pub minimized:     bool,
    /// Window is zoomed
    pub maximized:     bool,
    /// Window has the visible style
    pub visible:       bool,
    /// Owning process id
    pub process_id:    u32,
    /// Window is hosted by the modern app shell
    pub is_modern_app: bool,
    /// Window caption
    #[serde(default)]
    pub title:         String,
    /// Window class name
    #[serde(default)]
    pub class_name:    String,
}

impl WindowTarget {
    /// Rectangle the capturers should produce for this window
    pub fn capture_bounds(&self, client_area_only: bool) -> Rect {
        if client_area_only && !self.client_bounds.is_empty() {
            self.client_bounds
        } else {
            self.bounds
        }
    }
}

/// One physical monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Monitor rectangle in virtual-desktop coordinates
    pub bounds:      Rect,
    /// Device name (e.g. `\\.\DISPLAY1`)
    #[serde(default)]
    pub device_name: String,
    /// Whether this is the primary monitor
    #[serde(default)]
    pub primary:     bool,
}

impl DisplayInfo {
    /// Creates a display description
    pub fn new(bounds: Rect, device_name: impl Into<String>, primary: bool) -> Self {
        Self {
            bounds,
            device_name: device_name.into(),
            primary,
        }
    }
}

/// How a target should be rasterized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Direct copy from the desktop device context
    Screen,
    /// Ask the window to print itself (GDI)
    WindowSpecific,
    /// Composited window surface, flattened onto the background colour
    Compositor,
    /// Composited window surface with its alpha channel kept
    CompositorTransparent,
    /// Pick one of the above from window attributes
    #[default]
    Auto,
}

impl CaptureMode {
    /// Returns the mode as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Screen => "screen",
            CaptureMode::WindowSpecific => "gdi",
            CaptureMode::Compositor => "compositor",
            CaptureMode::CompositorTransparent => "compositor_transparent",
            CaptureMode::Auto => "auto",
        }
    }

    /// True for both compositor flavours
    pub fn is_compositor(&self) -> bool {
        matches!(self, CaptureMode::Compositor | CaptureMode::CompositorTransparent)
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts the [`as_str`](CaptureMode::as_str) names plus the legacy
/// aliases `window_specific`, `dwm`, `aero` and `aero_transparent`
impl std::str::FromStr for CaptureMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(CaptureMode::Auto),
            "screen" => Ok(CaptureMode::Screen),
            "gdi" | "window_specific" => Ok(CaptureMode::WindowSpecific),
            "compositor" | "dwm" | "aero" => Ok(CaptureMode::Compositor),
            "compositor_transparent" | "aero_transparent" => Ok(CaptureMode::CompositorTransparent),
            other => Err(format!("unknown window capture mode '{other}'")),
        }
    }
}

/// What to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CaptureTarget {
    /// A single top-level window
    Window(WindowHandle),
    /// A rectangle of the virtual desktop
    Region(Rect),
    /// The bounding box of every monitor
    FullScreen,
}

/// A capture call as issued by the capture-handling collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub target:       CaptureTarget,
    /// Requested mode; `None` uses the configured window capture mode
    #[serde(default)]
    pub mode:         Option<CaptureMode>,
    /// Destination designators the finished capture is routed to
    #[serde(default)]
    pub destinations: Vec<String>,
    /// Overrides the title derived from the target
    #[serde(default)]
    pub title:        Option<String>,
}

impl CaptureRequest {
    /// Request for a window with the configured mode
    pub fn window(handle: WindowHandle) -> Self {
        Self::new(CaptureTarget::Window(handle))
    }

    /// Request for a desktop region
    pub fn region(rect: Rect) -> Self {
        Self::new(CaptureTarget::Region(rect))
    }

    /// Request for all monitors
    pub fn full_screen() -> Self {
        Self::new(CaptureTarget::FullScreen)
    }

    fn new(target: CaptureTarget) -> Self {
        Self {
            target,
            mode: None,
            destinations: Vec::new(),
            title: None,
        }
    }

    /// Sets an explicit capture mode
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Adds a destination designator
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destinations.push(destination.into());
        self
    }

    /// Sets the title recorded in the capture details
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Attributes of the process that owns a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid:          u32,
    /// Executable base name (e.g. `notepad.exe`)
    pub name:         String,
    /// Product name from the executable's version resource
    #[serde(default)]
    pub product_name: Option<String>,
    /// Base names of the loaded modules; empty when access was denied
    #[serde(default)]
    pub modules:      Vec<String>,
}

impl ProcessInfo {
    /// Returns true if the process loaded the WPF presentation framework
    pub fn uses_presentation_framework(&self) -> bool {
        self.modules
            .iter()
            .any(|module| module.to_ascii_lowercase().starts_with("presentationframework"))
    }
}

/// Raw pointer state as read from the platform
#[derive(Debug, Clone)]
pub struct CursorSnapshot {
    /// Cursor bitmap (RGBA)
    pub image:           ImageBuffer,
    /// Hot-spot offset inside the bitmap
    pub hotspot:         Point,
    /// Pointer position in virtual-desktop coordinates
    pub screen_position: Point,
    /// False while the owning application hides the pointer
    pub showing:         bool,
}
