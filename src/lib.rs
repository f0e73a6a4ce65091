//! screenshot-engine: capture strategy resolution and execution
//!
//! This library decides how a desktop window or region should be
//! rasterized (a plain screen copy, asking the window to print itself, or
//! reading its composited surface), falls back when a strategy produces
//! nothing usable, and returns the bitmap with its placement, pointer
//! overlay and details.
//!
//! The entry point is [`capture::CaptureEngine`].

pub mod capture;
pub mod config;
pub mod error;
pub mod model;
