//! Capture strategies and the engine that runs them
//!
//! This module provides:
//!
//! - [`ImageBuffer`] and [`Capture`]: the bitmap and the value handed back
//!   to the caller
//! - Capability traits ([`DesktopBlitter`], [`WindowRenderer`], ...) that a
//!   platform implements, bundled in a [`PlatformBackend`]
//! - One capturer per strategy: [`region`], [`window_gdi`], [`compositor`],
//!   plus the [`cursor`] overlay and the [`quality`] check
//! - [`resolver`]: picks the strategy and its fallbacks for a window
//! - [`CaptureEngine`]: executes a request asynchronously on top of all of
//!   the above
//! - [`MockPlatform`] for tests and [`WindowsBackend`] for the real desktop
//!   (Windows only)

#[allow(clippy::module_inception)]
pub mod capture;
pub mod composite;
pub mod compositor;
pub mod constants;
pub mod cursor;
pub mod engine;
pub mod image_buffer;
pub mod mock;
pub mod quality;
pub mod region;
pub mod resolver;
pub mod topology;
pub mod traits;
pub mod window_gdi;

#[cfg(target_os = "windows")]
pub mod windows_backend;

pub use capture::{Capture, CaptureDetails, CursorOverlay};
pub use composite::PlatformBackend;
pub use engine::{AttemptOutcome, AttemptRecord, CaptureEngine, CaptureService, StrategyTrace};
pub use image_buffer::{ImageBuffer, PixelFormat};
pub use mock::MockPlatform;
pub use topology::DisplayTopology;
pub use traits::{
    CompositorSource, CursorSource, DesktopBlitter, DisplayEnumerator, ProcessInspector,
    WindowOperations, WindowRenderer,
};
#[cfg(target_os = "windows")]
pub use windows_backend::WindowsBackend;
