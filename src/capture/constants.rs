//! Centralized timing and heuristic constants for the capture engine.
//!
//! Values that depend on the machine (driver behaviour, animation speed) can
//! be overridden at runtime via environment variables:
//!
//! | Environment Variable | Default | Description |
//! |---------------------|---------|-------------|
//! | `SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS` | 5000 | Wait for a compositor frame |
//!
//! Per-capture settings (settle delay, retry count, deny-lists) live in
//! [`CaptureConfig`](crate::config::CaptureConfig) instead, because they are
//! re-read on every capture call.

/// Time a restored window needs before its pixels are valid.
///
/// Restoring an iconic window plays the restore animation; GDI and screen
/// copies taken during the animation show a half-drawn frame.
pub const RESTORE_SETTLE_DELAY_MS: u64 = 300;

/// Attempts for the desktop block copy before a platform error is surfaced.
///
/// Materializing the copied surface fails transiently under some multi-GPU
/// driver combinations; a second or third attempt usually succeeds.
pub const REGION_CAPTURE_ATTEMPTS: u32 = 3;

/// Below this share of solid-black pixels a GDI capture is trusted as is.
pub const TRUSTED_BLACK_PERCENT: f64 = 1.0;

/// A cropped screen capture only replaces a GDI capture that is more than
/// this share black.
pub const CROPPED_SCREEN_BLACK_PERCENT: f64 = 50.0;

/// DPI reported when the platform cannot tell.
pub const DEFAULT_DPI: f32 = 96.0;

/// Timeout for the compositor to deliver a window frame.
///
/// The first Windows Graphics Capture session in a process loads the
/// capture DLLs and allocates GPU resources, which can take a second or two.
///
/// Used by: Windows backend
pub const COMPOSITOR_FRAME_TIMEOUT_MS: u64 = 5000;

/// Helper to get a timeout from environment variable or fall back to default.
fn get_timeout_from_env(env_var: &str, default: u64) -> u64 {
    std::env::var(env_var)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Get the compositor frame timeout, checking environment variable override.
///
/// Override with: `SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS`
///
/// # Example
///
/// ```bash
/// # Allow 10 seconds on slow GPUs
/// export SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS=10000
/// ```
pub fn compositor_frame_timeout_ms() -> u64 {
    get_timeout_from_env("SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS", COMPOSITOR_FRAME_TIMEOUT_MS)
}

#[cfg(test)]
#[allow(clippy::assertions_on_constants)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_sanity() {
        assert!(RESTORE_SETTLE_DELAY_MS > 0);
        assert!(REGION_CAPTURE_ATTEMPTS >= 1);
        assert!(TRUSTED_BLACK_PERCENT < CROPPED_SCREEN_BLACK_PERCENT);
        assert!(CROPPED_SCREEN_BLACK_PERCENT < 100.0);
        assert!(RESTORE_SETTLE_DELAY_MS < COMPOSITOR_FRAME_TIMEOUT_MS);
    }

    #[test]
    fn test_env_override_default() {
        temp_env::with_var_unset("SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS", || {
            assert_eq!(compositor_frame_timeout_ms(), COMPOSITOR_FRAME_TIMEOUT_MS);
        });
    }

    #[test]
    fn test_env_override_with_value() {
        temp_env::with_var("SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS", Some("10000"), || {
            assert_eq!(compositor_frame_timeout_ms(), 10000);
        });
    }

    #[test]
    fn test_env_override_invalid_value() {
        temp_env::with_var("SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS", Some("soon"), || {
            assert_eq!(compositor_frame_timeout_ms(), COMPOSITOR_FRAME_TIMEOUT_MS);
        });

        temp_env::with_var("SCREENSHOT_ENGINE_COMPOSITOR_TIMEOUT_MS", Some("-1"), || {
            assert_eq!(compositor_frame_timeout_ms(), COMPOSITOR_FRAME_TIMEOUT_MS);
        });
    }
}
