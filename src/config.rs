//! Capture configuration
//!
//! [`CaptureConfig`] holds the user-facing knobs the engine consults:
//! per-process deny-lists, the default window capture mode, cursor and
//! client-area options, and a few workarounds. It is plain data supplied by
//! an external configuration store.
//!
//! The engine never caches a configuration across captures. It asks its
//! [`ConfigSource`] for a fresh value at the start of every call, so edits
//! made while the application runs apply to the next capture.
//!
//! # Sources
//!
//! - [`StaticConfig`]: a fixed value, mostly for tests and embedding
//! - [`EnvConfig`]: optional JSON file named by `SCREENSHOT_ENGINE_CONFIG`,
//!   then `SCREENSHOT_ENGINE_*` overrides, re-read on every call
//!
//! | Environment Variable | Type |
//! |---------------------|------|
//! | `SCREENSHOT_ENGINE_CONFIG` | path to a JSON file |
//! | `SCREENSHOT_ENGINE_WINDOW_CAPTURE_MODE` | `auto`, `screen`, `gdi`, `compositor`, `compositor_transparent` |
//! | `SCREENSHOT_ENGINE_NO_GDI_CAPTURE_FOR` | comma-separated names |
//! | `SCREENSHOT_ENGINE_NO_COMPOSITOR_CAPTURE_FOR` | comma-separated names |
//! | `SCREENSHOT_ENGINE_COMPOSITOR_ONLY_PROCESSES` | comma-separated names |
//! | `SCREENSHOT_ENGINE_CAPTURE_CURSOR` | bool |
//! | `SCREENSHOT_ENGINE_CLIENT_AREA_ONLY` | bool |
//! | `SCREENSHOT_ENGINE_RESTORE_SETTLE_DELAY_MS` | integer |
//! | `SCREENSHOT_ENGINE_MINIMIZE_WORKING_SET` | bool |
//! | `SCREENSHOT_ENGINE_DPI_WORKAROUND` | bool |
//! | `SCREENSHOT_ENGINE_REGION_RETRY_ATTEMPTS` | integer, at least 1 |
//! | `SCREENSHOT_ENGINE_COMPOSITOR_BACKGROUND` | `#rrggbb` or `r,g,b` |

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    capture::constants::{REGION_CAPTURE_ATTEMPTS, RESTORE_SETTLE_DELAY_MS},
    error::{CaptureError, CaptureResult},
    model::{CaptureMode, ProcessInfo},
};

/// Environment variable naming an optional JSON configuration file
pub const CONFIG_PATH_ENV: &str = "SCREENSHOT_ENGINE_CONFIG";

/// Capture engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Processes whose windows must never be captured with GDI
    pub no_gdi_capture_for:        Vec<String>,
    /// Processes whose windows must never be captured through the compositor
    pub no_compositor_capture_for: Vec<String>,
    /// Browser-style hosts that only render through the compositor
    pub compositor_only_processes: Vec<String>,
    /// Mode used when a request does not name one
    pub window_capture_mode:       CaptureMode,
    /// Attach the pointer to captures
    pub capture_cursor:            bool,
    /// Capture the client area instead of the whole window frame
    pub client_area_only:          bool,
    /// Colour composited windows are flattened onto
    pub compositor_background:     [u8; 3],
    /// Wait after restoring a minimized window
    pub restore_settle_delay_ms:   u64,
    /// Attempts for the desktop block copy
    pub region_retry_attempts:     u32,
    /// Trim the process working set after each capture
    pub minimize_working_set:      bool,
    /// Re-query window bounds after a foreground switch
    pub dpi_workaround:            bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            no_gdi_capture_for:        vec!["IntelliJ IDEA".to_string()],
            no_compositor_capture_for: vec!["Citrix ICA Client".to_string()],
            compositor_only_processes: vec![
                "ApplicationFrameHost".to_string(),
                "msedgewebview2".to_string(),
            ],
            window_capture_mode:       CaptureMode::Auto,
            capture_cursor:            false,
            client_area_only:          false,
            compositor_background:     [255, 255, 255],
            restore_settle_delay_ms:   RESTORE_SETTLE_DELAY_MS,
            region_retry_attempts:     REGION_CAPTURE_ATTEMPTS,
            minimize_working_set:      false,
            dpi_workaround:            false,
        }
    }
}

impl CaptureConfig {
    /// Loads a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| CaptureError::ConfigError {
            reason: format!("{}: {}", path.as_ref().display(), e),
        })
    }

    /// Applies `SCREENSHOT_ENGINE_*` overrides on top of `self`
    pub fn apply_env(mut self) -> CaptureResult<Self> {
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_WINDOW_CAPTURE_MODE") {
            self.window_capture_mode = parse_mode(&raw)?;
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_NO_GDI_CAPTURE_FOR") {
            self.no_gdi_capture_for = parse_list(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_NO_COMPOSITOR_CAPTURE_FOR") {
            self.no_compositor_capture_for = parse_list(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_COMPOSITOR_ONLY_PROCESSES") {
            self.compositor_only_processes = parse_list(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_CAPTURE_CURSOR") {
            self.capture_cursor = parse_bool(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_CLIENT_AREA_ONLY") {
            self.client_area_only = parse_bool(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_RESTORE_SETTLE_DELAY_MS") {
            self.restore_settle_delay_ms =
                raw.parse().map_err(|_| CaptureError::ConfigError {
                    reason: format!("SCREENSHOT_ENGINE_RESTORE_SETTLE_DELAY_MS={raw} is not a number"),
                })?;
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_MINIMIZE_WORKING_SET") {
            self.minimize_working_set = parse_bool(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_DPI_WORKAROUND") {
            self.dpi_workaround = parse_bool(&raw);
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_REGION_RETRY_ATTEMPTS") {
            self.region_retry_attempts = raw
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or_else(|| CaptureError::ConfigError {
                    reason: format!("SCREENSHOT_ENGINE_REGION_RETRY_ATTEMPTS={raw} is not a positive number"),
                })?;
        }
        if let Some(raw) = env_value("SCREENSHOT_ENGINE_COMPOSITOR_BACKGROUND") {
            self.compositor_background = parse_rgb(&raw).ok_or_else(|| CaptureError::ConfigError {
                reason: format!("SCREENSHOT_ENGINE_COMPOSITOR_BACKGROUND={raw} is not a color"),
            })?;
        }
        Ok(self)
    }

    /// Window of this process must not be captured with GDI
    pub fn gdi_denied(&self, process: &ProcessInfo) -> bool {
        process_listed(&self.no_gdi_capture_for, process)
    }

    /// Window of this process must not be captured through the compositor
    pub fn compositor_denied(&self, process: &ProcessInfo) -> bool {
        process_listed(&self.no_compositor_capture_for, process)
    }

    /// Process only renders through the compositor
    pub fn compositor_only(&self, process: &ProcessInfo) -> bool {
        process_listed(&self.compositor_only_processes, process)
    }
}

/// Supplies the configuration for one capture call
pub trait ConfigSource: Send + Sync {
    /// Returns the configuration to use for the capture about to start
    fn current(&self) -> CaptureResult<CaptureConfig>;
}

/// A fixed configuration
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub CaptureConfig);

impl ConfigSource for StaticConfig {
    fn current(&self) -> CaptureResult<CaptureConfig> {
        Ok(self.0.clone())
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn current(&self) -> CaptureResult<CaptureConfig> {
        (**self).current()
    }
}

/// Reads the optional config file and environment overrides on every call
#[derive(Debug, Clone, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn current(&self) -> CaptureResult<CaptureConfig> {
        let base = match env_value(CONFIG_PATH_ENV) {
            Some(path) => CaptureConfig::from_json_file(path)?,
            None => CaptureConfig::default(),
        };
        base.apply_env()
    }
}

/// Compares case-insensitively against the executable name (without
/// `.exe`) and the product name
fn process_listed(list: &[String], process: &ProcessInfo) -> bool {
    let name = normalize_process_name(&process.name);
    let product = process.product_name.as_deref().map(str::to_lowercase);

    list.iter().map(|entry| normalize_process_name(entry)).any(|entry| {
        !entry.is_empty() && (entry == name || product.as_deref() == Some(entry.as_str()))
    })
}

fn normalize_process_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lowered,
    }
}

fn env_value(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// `1`, `true`, `yes` and `on` (any case) are true; everything else is false
fn parse_bool(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// `#rrggbb` or three comma-separated bytes
fn parse_rgb(raw: &str) -> Option<[u8; 3]> {
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
        return Some([channel(0)?, channel(2)?, channel(4)?]);
    }

    let mut channels = raw.split(',').map(|part| part.trim().parse::<u8>());
    let rgb = [
        channels.next()?.ok()?,
        channels.next()?.ok()?,
        channels.next()?.ok()?,
    ];
    channels.next().is_none().then_some(rgb)
}

fn parse_mode(raw: &str) -> CaptureResult<CaptureMode> {
    raw.parse()
        .map_err(|reason| CaptureError::ConfigError { reason })
}
