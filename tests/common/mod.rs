//! Shared test utilities for the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use screenshot_engine::{
    capture::{
        CaptureEngine,
        composite::platform_from_mock,
        mock::{MockPlatform, MockScenario, MockWindow},
    },
    config::CaptureConfig,
    model::Rect,
};

/// Default configuration without the post-restore wait
pub fn quick_config() -> CaptureConfig {
    CaptureConfig {
        restore_settle_delay_ms: 0,
        ..CaptureConfig::default()
    }
}

/// Builds an engine over a simulated desktop and hands back the mock for
/// call inspection
pub fn engine_for(scenario: MockScenario, config: CaptureConfig) -> (CaptureEngine, Arc<MockPlatform>) {
    let mock = Arc::new(MockPlatform::new(scenario));
    let platform = Arc::new(platform_from_mock(Arc::clone(&mock)));
    (CaptureEngine::with_config(platform, config), mock)
}

/// An ordinary desktop application window at (100, 100) sized 400x300
pub fn notepad(handle: u64) -> MockWindow {
    MockWindow::new(handle, Rect::new(100, 100, 400, 300), 4242).with_title("Untitled - Notepad")
}
