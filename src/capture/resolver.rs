//! Capture strategy resolution
//!
//! [`StrategyResolver`] decides which [`CaptureMode`] to try first for a
//! window and what to fall back to when a strategy declines. It is pure: it
//! looks at a window snapshot, the owning process, whether the compositor is
//! on, and the configured per-process restrictions. Executing the decision
//! is the engine's job.
//!
//! # Auto resolution
//!
//! 1. Modern apps and compositor-only hosts go straight to the compositor
//!    when it is on and allowed, else to a screen copy. GDI is never their
//!    first choice.
//! 2. Everything else starts at [`CaptureMode::Screen`], is promoted to
//!    [`CaptureMode::WindowSpecific`] when GDI is legal, and promoted again to
//!    [`CaptureMode::Compositor`] when the compositor is on and allowed.
//!
//! # Fallbacks
//!
//! ```text
//! Compositor ──► WindowSpecific ──► Screen
//!      └──────────(GDI illegal)──────►┘
//! ```

use crate::{
    config::CaptureConfig,
    model::{CaptureMode, ProcessInfo, WindowTarget},
};

/// Decides strategies for one window
#[derive(Debug, Clone, Copy)]
pub struct StrategyResolver<'a> {
    window:             &'a WindowTarget,
    process:            &'a ProcessInfo,
    compositor_enabled: bool,
    config:             &'a CaptureConfig,
}

impl<'a> StrategyResolver<'a> {
    pub fn new(
        window: &'a WindowTarget,
        process: &'a ProcessInfo,
        compositor_enabled: bool,
        config: &'a CaptureConfig,
    ) -> Self {
        Self {
            window,
            process,
            compositor_enabled,
            config,
        }
    }

    /// GDI may be used for this window
    ///
    /// Not when the process is on the GDI deny-list, and not for WPF
    /// processes while the compositor is on (they print black).
    pub fn gdi_legal(&self) -> bool {
        !self.config.gdi_denied(self.process)
            && (!self.compositor_enabled || !self.process.uses_presentation_framework())
    }

    /// The compositor is on and may be used for this window
    ///
    /// Modern apps are always allowed.
    pub fn compositor_allowed(&self) -> bool {
        self.compositor_enabled
            && (self.window.is_modern_app || !self.config.compositor_denied(self.process))
    }

    /// Window only renders correctly through the compositor
    pub fn prefers_compositor(&self) -> bool {
        self.window.is_modern_app || self.config.compositor_only(self.process)
    }

    /// Concrete mode to try first; never returns [`CaptureMode::Auto`]
    pub fn resolve(&self, requested: CaptureMode) -> CaptureMode {
        let resolved = match requested {
            CaptureMode::Auto => self.resolve_auto(),
            CaptureMode::Compositor | CaptureMode::CompositorTransparent => {
                if self.compositor_allowed() {
                    requested
                } else {
                    self.degraded()
                }
            }
            CaptureMode::WindowSpecific => self.degraded(),
            CaptureMode::Screen => CaptureMode::Screen,
        };

        if resolved != requested {
            tracing::debug!(
                requested = %requested,
                resolved = %resolved,
                gdi_legal = self.gdi_legal(),
                compositor_allowed = self.compositor_allowed(),
                "Resolved capture mode"
            );
        }
        resolved
    }

    /// Next mode after `mode` declined; `None` after [`CaptureMode::Screen`]
    pub fn fallback(&self, mode: CaptureMode) -> Option<CaptureMode> {
        match mode {
            CaptureMode::Compositor | CaptureMode::CompositorTransparent => {
                if self.gdi_legal() {
                    Some(CaptureMode::WindowSpecific)
                } else {
                    Some(CaptureMode::Screen)
                }
            }
            CaptureMode::WindowSpecific => Some(CaptureMode::Screen),
            CaptureMode::Screen | CaptureMode::Auto => None,
        }
    }

    /// Full order of modes that may be attempted starting at `requested`
    pub fn plan(&self, requested: CaptureMode) -> Vec<CaptureMode> {
        let mut plan = vec![self.resolve(requested)];
        while let Some(next) = plan.last().and_then(|mode| self.fallback(*mode)) {
            plan.push(next);
        }
        plan
    }

    fn resolve_auto(&self) -> CaptureMode {
        if self.prefers_compositor() {
            return if self.compositor_allowed() {
                CaptureMode::Compositor
            } else {
                CaptureMode::Screen
            };
        }

        let mut mode = CaptureMode::Screen;
        if self.gdi_legal() {
            mode = CaptureMode::WindowSpecific;
        }
        if self.compositor_allowed() {
            mode = CaptureMode::Compositor;
        }
        mode
    }

    /// GDI when legal, otherwise a screen copy
    fn degraded(&self) -> CaptureMode {
        if self.gdi_legal() {
            CaptureMode::WindowSpecific
        } else {
            CaptureMode::Screen
        }
    }
}
