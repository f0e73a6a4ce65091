//! Capture engine
//!
//! [`CaptureEngine`] executes one [`CaptureRequest`] end to end: it reads the
//! configuration and the monitor layout, resolves a strategy for window
//! targets, walks the fallback chain until a strategy produces a bitmap, and
//! then attaches the pointer and the capture details.
//!
//! Every platform call runs on the blocking pool and is awaited before the
//! next one starts, so calls for one window never overlap. Cancellation is
//! checked before every attempt and while waiting for a restored window to
//! settle; a platform call that already started runs to completion.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use screenshot_engine::{
//!     capture::{
//!         CaptureEngine,
//!         composite::platform_from_mock,
//!         mock::{MockPlatform, MockScenario},
//!     },
//!     config::{CaptureConfig, StaticConfig},
//!     model::{CaptureRequest, Rect},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mock = Arc::new(MockPlatform::new(MockScenario::single_display(1920, 1080)));
//! let engine = CaptureEngine::new(
//!     Arc::new(platform_from_mock(mock)),
//!     Arc::new(StaticConfig(CaptureConfig::default())),
//! );
//!
//! let capture = engine
//!     .capture(&CaptureRequest::region(Rect::new(10, 10, 200, 100)), &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(capture.bounds(), Rect::new(10, 10, 200, 100));
//! # }
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{
    Capture, DisplayTopology, ImageBuffer, PlatformBackend,
    compositor::{CompositorCapturer, CompositorOptions},
    cursor::CursorOverlayCapturer,
    quality::{CaptureQualityValidator, QualityVerdict},
    region::RawRegionCapturer,
    resolver::StrategyResolver,
    window_gdi::{WindowSpecificCapturer, window_capture_rect},
};
use crate::{
    config::{CaptureConfig, ConfigSource, StaticConfig},
    error::{CaptureError, CaptureResult},
    model::{CaptureMode, CaptureRequest, CaptureTarget, ProcessInfo, Rect, WindowHandle, WindowTarget},
};

// ============================================================================
// Attempt trace
// ============================================================================

/// How one strategy attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Produced the final bitmap
    Succeeded,
    /// Produced nothing; the next strategy was tried
    Declined,
    /// GDI produced a bitmap that lost to a screen copy of the same area
    ReplacedByScreen,
    /// Hard failure that ended the capture
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Declined => "declined",
            AttemptOutcome::ReplacedByScreen => "replaced_by_screen",
            AttemptOutcome::Failed => "failed",
        }
    }
}

/// One strategy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub mode:        CaptureMode,
    pub outcome:     AttemptOutcome,
    pub duration_ms: u64,
}

/// Which strategies a capture tried, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyTrace {
    /// Mode asked for (after applying the configured default)
    pub requested: CaptureMode,
    /// First mode actually tried
    pub resolved:  CaptureMode,
    pub attempts:  Vec<AttemptRecord>,
}

impl StrategyTrace {
    fn new(requested: CaptureMode, resolved: CaptureMode) -> Self {
        Self {
            requested,
            resolved,
            attempts: Vec::new(),
        }
    }

    fn record(&mut self, mode: CaptureMode, outcome: AttemptOutcome, started: Instant) {
        self.attempts.push(AttemptRecord {
            mode,
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// True if `mode` was attempted at all
    pub fn attempted(&self, mode: CaptureMode) -> bool {
        self.attempts.iter().any(|attempt| attempt.mode == mode)
    }

    /// Compact form, e.g. `compositor:declined,gdi:succeeded`
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|attempt| format!("{}:{}", attempt.mode, attempt.outcome.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ============================================================================
// Service seam
// ============================================================================

/// Asynchronous capture entry point
///
/// Callers that route finished captures depend on this trait rather than on
/// the concrete engine.
#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Captures the requested target
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Canceled`] if `cancel` fired before an attempt
    /// - [`CaptureError::PlatformCapture`] when a screen copy failed
    /// - [`CaptureError::InvalidHandle`] for a handle that names no window
    async fn capture(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> CaptureResult<Capture>;
}

// ============================================================================
// Engine
// ============================================================================

/// Bitmap produced by one successful attempt
struct AttemptImage {
    image:   ImageBuffer,
    rect:    Rect,
    outcome: AttemptOutcome,
    verdict: Option<QualityVerdict>,
}

/// Executes capture requests against a platform
#[derive(Clone)]
pub struct CaptureEngine {
    platform: Arc<PlatformBackend>,
    config:   Arc<dyn ConfigSource>,
}

impl std::fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl CaptureEngine {
    pub fn new(platform: Arc<PlatformBackend>, config: Arc<dyn ConfigSource>) -> Self {
        Self { platform, config }
    }

    /// Engine with a fixed configuration
    pub fn with_config(platform: Arc<PlatformBackend>, config: CaptureConfig) -> Self {
        Self::new(platform, Arc::new(StaticConfig(config)))
    }

    pub fn platform(&self) -> &PlatformBackend {
        &self.platform
    }

    /// Captures the requested target
    ///
    /// See [`CaptureService::capture`] for the error cases.
    pub async fn capture(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> CaptureResult<Capture> {
        self.capture_traced(request, cancel)
            .await
            .map(|(capture, _)| capture)
    }

    /// Captures the requested target and reports which strategies ran
    #[tracing::instrument(skip_all, fields(target = ?request.target, mode = ?request.mode))]
    pub async fn capture_traced(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> CaptureResult<(Capture, StrategyTrace)> {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return Err(CaptureError::Canceled);
        }

        let source = Arc::clone(&self.config);
        let config = blocking("load configuration", move || source.current()).await?;
        let topology = self
            .run_blocking("enumerate displays", |platform| {
                DisplayTopology::enumerate(platform.displays.as_ref())
            })
            .await?;
        tracing::debug!(displays = topology.displays().len(), bounds = %topology.bounds(), "Display topology");

        let (mut capture, trace, window) = match request.target {
            CaptureTarget::Region(rect) => {
                let (capture, trace) = self.capture_region(rect, &config, &topology, cancel).await?;
                (capture, trace, None)
            }
            CaptureTarget::FullScreen => {
                let (capture, trace) = self
                    .capture_region(topology.bounds(), &config, &topology, cancel)
                    .await?;
                (capture, trace, None)
            }
            CaptureTarget::Window(handle) => {
                let requested = request.mode.unwrap_or(config.window_capture_mode);
                let (capture, trace, window) = self
                    .capture_window(handle, requested, &config, &topology, cancel)
                    .await?;
                (capture, trace, Some(window))
            }
        };

        if config.capture_cursor {
            let origin = capture.origin();
            let overlay = self
                .run_blocking("read cursor", move |platform| {
                    Ok(platform
                        .cursor
                        .as_deref()
                        .and_then(|source| CursorOverlayCapturer::new(source).capture(origin)))
                })
                .await?;
            capture.set_cursor(overlay);
        }

        let dpi = self.capture_dpi(window.as_ref()).await;
        let final_mode = trace
            .attempts
            .last()
            .map(|attempt| match attempt.outcome {
                AttemptOutcome::ReplacedByScreen => CaptureMode::Screen,
                _ => attempt.mode,
            })
            .unwrap_or(CaptureMode::Screen);

        let details = capture.details_mut();
        details.title = request.title.clone().unwrap_or_else(|| match (&request.target, &window) {
            (_, Some(window)) => window.title.clone(),
            (CaptureTarget::FullScreen, None) => "Full screen".to_string(),
            (CaptureTarget::Region(rect), None) => format!("Region {rect}"),
            (CaptureTarget::Window(handle), None) => format!("Window {handle}"),
        });
        details.mode = final_mode;
        details.dpi_x = dpi as f32;
        details.dpi_y = dpi as f32;
        details.destinations = request.destinations.clone();
        details.add_metadata("strategy.requested", trace.requested.as_str());
        details.add_metadata("strategy.resolved", trace.resolved.as_str());
        details.add_metadata("strategy.attempts", trace.summary());
        details.captured_at = Local::now();

        if config.minimize_working_set {
            if let Err(error) = self
                .run_blocking("minimize working set", |platform| {
                    platform.processes.minimize_working_set()
                })
                .await
            {
                tracing::warn!(error = %error, "Could not trim working set");
            }
        }

        tracing::info!(
            mode = %final_mode,
            bounds = %capture.bounds(),
            attempts = %trace.summary(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Capture complete"
        );
        Ok((capture, trace))
    }

    async fn capture_region(
        &self,
        rect: Rect,
        config: &CaptureConfig,
        topology: &DisplayTopology,
        cancel: &CancellationToken,
    ) -> CaptureResult<(Capture, StrategyTrace)> {
        let mut trace = StrategyTrace::new(CaptureMode::Screen, CaptureMode::Screen);
        if cancel.is_cancelled() {
            return Err(CaptureError::Canceled);
        }

        let started = Instant::now();
        let result = self
            .screen_copy(rect, config.region_retry_attempts, topology.clone())
            .await;
        let image = match result {
            Ok(image) => image,
            Err(error) => {
                trace.record(CaptureMode::Screen, AttemptOutcome::Failed, started);
                return Err(error);
            }
        };
        trace.record(CaptureMode::Screen, AttemptOutcome::Succeeded, started);

        let mut capture = Capture::new();
        capture.set_image(image, rect.origin());
        Ok((capture, trace))
    }

    async fn capture_window(
        &self,
        handle: WindowHandle,
        requested: CaptureMode,
        config: &CaptureConfig,
        topology: &DisplayTopology,
        cancel: &CancellationToken,
    ) -> CaptureResult<(Capture, StrategyTrace, WindowTarget)> {
        let initial = self
            .run_blocking("snapshot window", move |platform| platform.windows.snapshot(handle))
            .await?;

        let pid = initial.process_id;
        let process = match self
            .run_blocking("inspect process", move |platform| platform.processes.process_info(pid))
            .await
        {
            Ok(process) => process,
            Err(error) => {
                tracing::warn!(pid, error = %error, "Could not inspect owning process");
                ProcessInfo {
                    pid,
                    ..ProcessInfo::default()
                }
            }
        };
        let compositor_enabled = self
            .run_blocking("query compositor", |platform| Ok(platform.compositor_enabled()))
            .await?;

        let resolver = StrategyResolver::new(&initial, &process, compositor_enabled, config);
        let resolved = resolver.resolve(requested);
        let from_auto = requested == CaptureMode::Auto;
        let mut trace = StrategyTrace::new(requested, resolved);
        let mut window = initial.clone();

        tracing::debug!(
            %handle,
            process = %process.name,
            compositor_enabled,
            %requested,
            %resolved,
            "Starting window capture"
        );

        let mut next = Some(resolved);
        while let Some(mode) = next {
            if cancel.is_cancelled() {
                tracing::debug!(%mode, "Canceled before attempt");
                return Err(CaptureError::Canceled);
            }

            let started = Instant::now();
            let attempt = match mode {
                CaptureMode::Compositor | CaptureMode::CompositorTransparent => {
                    let result = self.prepare_window(window, config, false, cancel).await;
                    window = self.record_failure(result, &mut trace, mode, started)?;
                    let options =
                        CompositorOptions::for_mode(mode, from_auto, config.compositor_background);
                    self.compositor_attempt(&window, config.client_area_only, options, topology)
                        .await
                }
                CaptureMode::WindowSpecific => {
                    let result = self.prepare_window(window, config, true, cancel).await;
                    window = self.record_failure(result, &mut trace, mode, started)?;
                    self.gdi_attempt(&window, config, topology).await
                }
                CaptureMode::Screen => {
                    let result = self.prepare_window(window, config, true, cancel).await;
                    window = self.record_failure(result, &mut trace, mode, started)?;
                    let rect = window_capture_rect(&window, config.client_area_only, topology);
                    self.screen_copy(rect, config.region_retry_attempts, topology.clone())
                        .await
                        .map(|image| {
                            Some(AttemptImage {
                                image,
                                rect,
                                outcome: AttemptOutcome::Succeeded,
                                verdict: None,
                            })
                        })
                }
                CaptureMode::Auto => Err(CaptureError::Internal {
                    reason: "auto mode reached execution unresolved".to_string(),
                }),
            };

            match self.record_failure(attempt, &mut trace, mode, started)? {
                Some(attempt) => {
                    trace.record(mode, attempt.outcome, started);
                    let mut capture = Capture::new();
                    capture.set_image(attempt.image, attempt.rect.origin());
                    if let Some(verdict) = attempt.verdict {
                        capture
                            .details_mut()
                            .add_metadata("quality.verdict", verdict_name(verdict));
                    }
                    return Ok((capture, trace, window));
                }
                None => {
                    trace.record(mode, AttemptOutcome::Declined, started);
                    next = resolver.fallback(mode);
                    tracing::warn!(%mode, next = ?next, "Capture strategy declined");
                }
            }
        }

        Err(CaptureError::Internal {
            reason: format!("no strategy produced an image ({})", trace.summary()),
        })
    }

    /// Notes a hard failure in the trace before propagating it
    fn record_failure<T>(
        &self,
        result: CaptureResult<T>,
        trace: &mut StrategyTrace,
        mode: CaptureMode,
        started: Instant,
    ) -> CaptureResult<T> {
        result.inspect_err(|error| {
            if !matches!(error, CaptureError::Canceled) {
                trace.record(mode, AttemptOutcome::Failed, started);
                tracing::warn!(%mode, error = %error, attempts = %trace.summary(), "Capture attempt failed");
            }
        })
    }

    /// Gets a window into a capturable state
    ///
    /// Minimized windows are restored and given time to repaint; the
    /// snapshot is then re-read because restoring moves the window. With
    /// `foreground`, a window that is not active is brought to the front
    /// (and re-read when the DPI workaround is on).
    async fn prepare_window(
        &self,
        window: WindowTarget,
        config: &CaptureConfig,
        foreground: bool,
        cancel: &CancellationToken,
    ) -> CaptureResult<WindowTarget> {
        let handle = window.handle;

        if window.minimized {
            tracing::debug!(%handle, delay_ms = config.restore_settle_delay_ms, "Restoring minimized window");
            self.run_blocking("restore window", move |platform| platform.windows.restore(handle))
                .await?;
            settle(config.restore_settle_delay_ms, cancel).await?;
            return self
                .run_blocking("snapshot window", move |platform| platform.windows.snapshot(handle))
                .await;
        }

        if !foreground {
            return Ok(window);
        }

        let active = self
            .run_blocking("query foreground", |platform| platform.windows.foreground_window())
            .await?;
        if active == Some(handle) {
            return Ok(window);
        }

        if let Err(error) = self
            .run_blocking("activate window", move |platform| {
                platform.windows.bring_to_foreground(handle)
            })
            .await
        {
            tracing::warn!(%handle, error = %error, "Could not bring window to foreground");
            return Ok(window);
        }

        if config.dpi_workaround {
            return self
                .run_blocking("snapshot window", move |platform| platform.windows.snapshot(handle))
                .await;
        }
        Ok(window)
    }

    async fn compositor_attempt(
        &self,
        window: &WindowTarget,
        client_area_only: bool,
        options: CompositorOptions,
        topology: &DisplayTopology,
    ) -> CaptureResult<Option<AttemptImage>> {
        let window = window.clone();
        let topology = topology.clone();
        self.run_blocking("compositor capture", move |platform| {
            let captured = CompositorCapturer::new(platform.compositor.as_deref(), &topology)
                .capture(&window, client_area_only, options);
            Ok(captured.map(|(image, rect)| AttemptImage {
                image,
                rect,
                outcome: AttemptOutcome::Succeeded,
                verdict: None,
            }))
        })
        .await
    }

    /// GDI print followed by the black-pixel check against a screen copy
    async fn gdi_attempt(
        &self,
        window: &WindowTarget,
        config: &CaptureConfig,
        topology: &DisplayTopology,
    ) -> CaptureResult<Option<AttemptImage>> {
        let window = window.clone();
        let topology = topology.clone();
        let client_area_only = config.client_area_only;
        let attempts = config.region_retry_attempts;

        self.run_blocking("window capture", move |platform| {
            let Some((image, rect)) = WindowSpecificCapturer::new(platform.renderer.as_deref(), &topology)
                .capture(&window, client_area_only)
            else {
                return Ok(None);
            };

            let mut screen_rect = rect;
            let decision = CaptureQualityValidator.choose(image, || {
                let clipped = topology.clip(&rect)?;
                screen_rect = clipped;
                match RawRegionCapturer::new(platform.blitter.as_ref(), attempts)
                    .capture(clipped, &topology)
                {
                    Ok(image) => Some(image),
                    Err(error) => {
                        tracing::warn!(rect = %clipped, error = %error, "Screen copy for quality check failed");
                        None
                    }
                }
            });

            let (rect, outcome) = match decision.verdict {
                QualityVerdict::UseScreen => (screen_rect, AttemptOutcome::ReplacedByScreen),
                QualityVerdict::TrustedGdi | QualityVerdict::KeepGdi => (rect, AttemptOutcome::Succeeded),
            };
            Ok(Some(AttemptImage {
                image: decision.image,
                rect,
                outcome,
                verdict: Some(decision.verdict),
            }))
        })
        .await
    }

    async fn screen_copy(
        &self,
        rect: Rect,
        attempts: u32,
        topology: DisplayTopology,
    ) -> CaptureResult<ImageBuffer> {
        self.run_blocking("screen copy", move |platform| {
            RawRegionCapturer::new(platform.blitter.as_ref(), attempts).capture(rect, &topology)
        })
        .await
    }

    /// DPI of the captured window, or the system DPI for desktop regions
    async fn capture_dpi(&self, window: Option<&WindowTarget>) -> u32 {
        let handle = window.map(|window| window.handle);
        let result = self
            .run_blocking("query dpi", move |platform| match handle {
                Some(handle) => platform
                    .windows
                    .dpi_for_window(handle)
                    .or_else(|_| Ok(platform.displays.system_dpi())),
                None => Ok(platform.displays.system_dpi()),
            })
            .await;
        result.unwrap_or(super::constants::DEFAULT_DPI as u32)
    }

    /// Runs a blocking platform call on the blocking pool
    async fn run_blocking<T, F>(&self, operation: &'static str, f: F) -> CaptureResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&PlatformBackend) -> CaptureResult<T> + Send + 'static,
    {
        let platform = Arc::clone(&self.platform);
        blocking(operation, move || f(&platform)).await
    }
}

#[async_trait]
impl CaptureService for CaptureEngine {
    async fn capture(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> CaptureResult<Capture> {
        CaptureEngine::capture(self, request, cancel).await
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> CaptureResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CaptureResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(operation, error = %e, "Blocking task panicked");
        CaptureError::Internal {
            reason: format!("{operation} task failed: {e}"),
        }
    })?
}

/// Waits for a restored window to repaint, unless canceled first
async fn settle(delay_ms: u64, cancel: &CancellationToken) -> CaptureResult<()> {
    if delay_ms == 0 {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!("Canceled while waiting for restored window");
            Err(CaptureError::Canceled)
        }
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => Ok(()),
    }
}

fn verdict_name(verdict: QualityVerdict) -> &'static str {
    match verdict {
        QualityVerdict::TrustedGdi => "trusted_gdi",
        QualityVerdict::KeepGdi => "keep_gdi",
        QualityVerdict::UseScreen => "use_screen",
    }
}
