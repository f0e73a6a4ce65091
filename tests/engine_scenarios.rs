//! End-to-end capture scenarios against the simulated desktop
//!
//! Each test describes a desktop with [`MockScenario`], runs a request
//! through [`CaptureEngine`] and checks both the produced bitmap and the
//! platform calls the engine made to get there.

mod common;

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use screenshot_engine::{
    capture::{
        CaptureEngine, PixelFormat,
        composite::platform_from_mock,
        mock::{MockCall, MockCursor, MockPlatform, MockResponse, MockScenario, MockSurface, MockWindow},
    },
    config::{CaptureConfig, ConfigSource, EnvConfig},
    error::{CaptureError, CaptureResult},
    model::{CaptureMode, CaptureRequest, DisplayInfo, Point, ProcessInfo, Rect, WindowHandle},
};
use tokio_util::sync::CancellationToken;

use crate::common::{engine_for, notepad, quick_config};

fn intellij(pid: u32) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: "idea64.exe".to_string(),
        product_name: Some("IntelliJ IDEA".to_string()),
        modules: vec!["ntdll.dll".to_string()],
    }
}

fn wpf_app(pid: u32) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: "Paint.exe".to_string(),
        product_name: None,
        modules: vec![
            "ntdll.dll".to_string(),
            "PresentationFramework.ni.dll".to_string(),
        ],
    }
}

fn print_window_calls(mock: &MockPlatform) -> usize {
    mock.call_count(|call| matches!(call, MockCall::PrintWindow(_)))
}

// ============================================================================
// Strategy legality
// ============================================================================

#[tokio::test]
async fn test_gdi_denied_process_never_prints() {
    let scenario = MockScenario::default()
        .with_window(notepad(1))
        .with_process(intellij(4242));
    let (engine, mock) = engine_for(scenario, quick_config());

    for mode in [CaptureMode::Auto, CaptureMode::WindowSpecific] {
        let request = CaptureRequest::window(WindowHandle(1)).with_mode(mode);
        let (capture, trace) = engine
            .capture_traced(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(trace.resolved, CaptureMode::Screen, "requested {mode}");
        assert!(!trace.attempted(CaptureMode::WindowSpecific));
        assert_eq!(capture.details().mode, CaptureMode::Screen);
        assert_eq!(capture.bounds(), Rect::new(100, 100, 400, 300));
    }
    assert_eq!(print_window_calls(&mock), 0);
}

#[tokio::test]
async fn test_wpf_with_compositor_skips_gdi_after_decline() {
    let scenario = MockScenario::default()
        .with_compositor(true)
        .with_window(notepad(1))
        .with_process(wpf_app(4242));
    let (engine, mock) = engine_for(scenario, quick_config());

    let (_, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "compositor:declined,screen:succeeded");
    assert_eq!(print_window_calls(&mock), 0);
}

#[tokio::test]
async fn test_wpf_without_compositor_may_print() {
    let scenario = MockScenario::default()
        .with_window(notepad(1))
        .with_process(wpf_app(4242));
    let (engine, _) = engine_for(scenario, quick_config());

    let (_, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "gdi:succeeded");
}

#[tokio::test]
async fn test_modern_app_declining_compositor_falls_back_to_gdi() {
    let scenario = MockScenario::default()
        .with_compositor(true)
        .with_window(notepad(1).modern());
    let (engine, mock) = engine_for(scenario, quick_config());

    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.resolved, CaptureMode::Compositor);
    assert_eq!(trace.summary(), "compositor:declined,gdi:succeeded");
    assert_eq!(capture.details().mode, CaptureMode::WindowSpecific);
    assert_eq!(print_window_calls(&mock), 1);
}

#[tokio::test]
async fn test_compositor_only_host_declining_falls_back_to_gdi() {
    let scenario = MockScenario::default()
        .with_compositor(true)
        .with_window(notepad(1))
        .with_process(ProcessInfo {
            pid: 4242,
            name: "msedgewebview2.exe".to_string(),
            ..ProcessInfo::default()
        });
    let (engine, mock) = engine_for(scenario, quick_config());

    let (_, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "compositor:declined,gdi:succeeded");
    let calls = mock.calls();
    let compositor = calls
        .iter()
        .position(|call| matches!(call, MockCall::CompositorCapture(_)))
        .expect("compositor tried");
    let print = calls
        .iter()
        .position(|call| matches!(call, MockCall::PrintWindow(_)))
        .expect("window printed");
    assert!(compositor < print);
}

#[tokio::test]
async fn test_gdi_denied_modern_app_declining_goes_to_screen() {
    let scenario = MockScenario::default()
        .with_compositor(true)
        .with_window(notepad(1).modern())
        .with_process(intellij(4242));
    let (engine, mock) = engine_for(scenario, quick_config());

    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "compositor:declined,screen:succeeded");
    assert_eq!(capture.details().mode, CaptureMode::Screen);
    assert_eq!(print_window_calls(&mock), 0);
}

#[tokio::test]
async fn test_modern_app_without_compositor_uses_screen() {
    let scenario = MockScenario::default().with_window(notepad(1).modern());
    let (engine, mock) = engine_for(scenario, quick_config());

    let (_, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "screen:succeeded");
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::CompositorCapture(_))), 0);
    assert_eq!(print_window_calls(&mock), 0);
}

#[tokio::test]
async fn test_compositor_only_process_by_name() {
    let window = notepad(1).with_compositor(MockResponse::Surface(MockSurface::Pattern));
    let scenario = MockScenario::default()
        .with_compositor(true)
        .with_window(window)
        .with_process(ProcessInfo {
            pid: 4242,
            name: "msedgewebview2.exe".to_string(),
            ..ProcessInfo::default()
        });
    let (engine, mock) = engine_for(scenario, quick_config());

    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "compositor:succeeded");
    assert_eq!(capture.details().mode, CaptureMode::Compositor);
    // Auto compositor captures are flattened to opaque pixels
    assert_eq!(capture.image().unwrap().pixel_format(), PixelFormat::Rgb24);
    assert_eq!(print_window_calls(&mock), 0);
}

// ============================================================================
// Region capture
// ============================================================================

#[tokio::test]
async fn test_region_inside_monitor_is_opaque_and_exact() {
    let (engine, _) = engine_for(MockScenario::single_display(1920, 1080), quick_config());
    let rect = Rect::new(300, 200, 640, 480);

    let capture = engine
        .capture(&CaptureRequest::region(rect), &CancellationToken::new())
        .await
        .unwrap();

    let image = capture.image().unwrap();
    assert_eq!(image.dimensions(), (640, 480));
    assert_eq!(image.pixel_format(), PixelFormat::Rgb24);
    assert_eq!(image.as_bytes(), MockPlatform::desktop_pattern(rect).as_bytes());
    assert_eq!(capture.origin(), Point::new(300, 200));
}

#[tokio::test]
async fn test_half_offscreen_region_is_transparent_outside() {
    let (engine, _) = engine_for(MockScenario::single_display(1920, 1080), quick_config());
    let rect = Rect::new(1820, 500, 200, 100);

    let capture = engine
        .capture(&CaptureRequest::region(rect), &CancellationToken::new())
        .await
        .unwrap();

    let image = capture.image().unwrap();
    assert_eq!(image.dimensions(), (200, 100));
    assert_eq!(image.pixel_format(), PixelFormat::Rgba32);

    let pixels = image.to_rgba8();
    let direct = MockPlatform::desktop_pattern(Rect::new(1820, 500, 100, 100)).to_rgba8();
    for y in 0..100 {
        for x in 0..100 {
            assert_eq!(pixels.get_pixel(x, y), direct.get_pixel(x, y), "inside pixel ({x}, {y})");
            assert_eq!(pixels.get_pixel(x + 100, y)[3], 0, "outside pixel ({}, {y})", x + 100);
        }
    }
}

#[tokio::test]
async fn test_region_spanning_two_monitors_is_opaque() {
    let scenario = MockScenario::single_display(1920, 1080).with_display(Rect::new(1920, 0, 1920, 1080));
    let (engine, mock) = engine_for(scenario, quick_config());
    let rect = Rect::new(1800, 100, 240, 100);

    let capture = engine
        .capture(&CaptureRequest::region(rect), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.image().unwrap().pixel_format(), PixelFormat::Rgb24);
    assert_eq!(capture.image().unwrap().dimensions(), (240, 100));
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 1);
}

#[tokio::test]
async fn test_region_retries_transient_blit_failures() {
    let scenario = MockScenario::default().with_transient_blit_failures(2);
    let (engine, mock) = engine_for(scenario, quick_config());

    let capture = engine
        .capture(&CaptureRequest::region(Rect::new(0, 0, 50, 50)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.bounds(), Rect::new(0, 0, 50, 50));
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 3);
}

#[tokio::test]
async fn test_region_gives_up_after_configured_attempts() {
    let scenario = MockScenario::default().with_transient_blit_failures(5);
    let config = CaptureConfig {
        region_retry_attempts: 2,
        ..quick_config()
    };
    let (engine, mock) = engine_for(scenario, config);

    let error = engine
        .capture(&CaptureRequest::region(Rect::new(0, 0, 50, 50)), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(error.is_transient());
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 2);
}

// ============================================================================
// Quality check
// ============================================================================

#[tokio::test]
async fn test_mostly_black_gdi_replaced_by_clipped_screen_copy() {
    // Window hangs 180px off the right edge, so the screen copy is smaller
    let window = MockWindow::new(1, Rect::new(1700, 100, 400, 300), 4242)
        .with_gdi(MockResponse::Surface(MockSurface::Black { percent: 60.0 }));
    let (engine, _) = engine_for(MockScenario::default().with_window(window), quick_config());

    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "gdi:replaced_by_screen");
    assert_eq!(capture.bounds(), Rect::new(1700, 100, 220, 300));
    assert_eq!(capture.details().metadata["quality.verdict"], "use_screen");
}

#[tokio::test]
async fn test_partly_black_gdi_kept_over_smaller_screen_copy() {
    let window = MockWindow::new(1, Rect::new(1700, 100, 400, 300), 4242)
        .with_gdi(MockResponse::Surface(MockSurface::Black { percent: 40.0 }));
    let (engine, mock) = engine_for(MockScenario::default().with_window(window), quick_config());

    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(trace.summary(), "gdi:succeeded");
    assert_eq!(capture.bounds(), Rect::new(1700, 100, 400, 300));
    assert_eq!(capture.details().mode, CaptureMode::WindowSpecific);
    assert_eq!(capture.details().metadata["quality.verdict"], "keep_gdi");
    // The comparison copy was still taken
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 1);
}

#[tokio::test]
async fn test_black_gdi_kept_when_screen_copy_fails() {
    let window = notepad(1).with_gdi(MockResponse::Surface(MockSurface::Black { percent: 100.0 }));
    let scenario = MockScenario::default()
        .with_window(window)
        .with_blit_error("desktop locked");
    let (engine, _) = engine_for(scenario, quick_config());

    let capture = engine
        .capture(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.details().mode, CaptureMode::WindowSpecific);
    assert_eq!(capture.details().metadata["quality.verdict"], "keep_gdi");
    assert_eq!(capture.image().unwrap().black_percentage(), 100.0);
}

#[tokio::test]
async fn test_nearly_clean_gdi_skips_screen_copy() {
    let window = notepad(1).with_gdi(MockResponse::Surface(MockSurface::Black { percent: 0.5 }));
    let (engine, mock) = engine_for(MockScenario::default().with_window(window), quick_config());

    let capture = engine
        .capture(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.details().metadata["quality.verdict"], "trusted_gdi");
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Blit(_))), 0);
}

// ============================================================================
// Window state
// ============================================================================

#[tokio::test]
async fn test_minimized_window_restored_then_printed() {
    let scenario = MockScenario::default().with_window(notepad(1).minimized());
    let config = CaptureConfig {
        restore_settle_delay_ms: 50,
        ..CaptureConfig::default()
    };
    let (engine, mock) = engine_for(scenario, config);

    let started = Instant::now();
    let (capture, trace) = engine
        .capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(trace.summary(), "gdi:succeeded");
    assert_eq!(capture.origin(), Point::new(100, 100));
    assert_eq!(capture.bounds(), Rect::new(100, 100, 400, 300));

    let calls = mock.calls();
    let restore = calls
        .iter()
        .position(|call| matches!(call, MockCall::Restore(WindowHandle(1))))
        .expect("window was restored");
    let print = calls
        .iter()
        .position(|call| matches!(call, MockCall::PrintWindow(WindowHandle(1))))
        .expect("window was printed");
    assert!(restore < print);
    // The post-restore geometry comes from a fresh snapshot
    assert!(
        calls[restore..print]
            .iter()
            .any(|call| matches!(call, MockCall::Snapshot(WindowHandle(1))))
    );
    assert!(!mock.window(WindowHandle(1)).unwrap().minimized);
}

#[tokio::test]
async fn test_maximized_window_clipped_to_its_monitor() {
    let window = MockWindow::new(1, Rect::new(-8, -8, 1936, 1056), 4242).maximized();
    let (engine, _) = engine_for(MockScenario::default().with_window(window), quick_config());

    let capture = engine
        .capture(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.bounds(), Rect::new(0, 0, 1920, 1048));
}

#[tokio::test]
async fn test_client_area_only() {
    let window = notepad(1).with_client(Rect::new(108, 131, 384, 261));
    let config = CaptureConfig {
        client_area_only: true,
        ..quick_config()
    };
    let (engine, _) = engine_for(MockScenario::default().with_window(window), config);

    let capture = engine
        .capture(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.bounds(), Rect::new(108, 131, 384, 261));
}

#[tokio::test]
async fn test_client_area_only_after_restore() {
    let window = notepad(1)
        .with_client(Rect::new(108, 131, 384, 261))
        .minimized();
    let config = CaptureConfig {
        client_area_only: true,
        ..quick_config()
    };
    let (engine, mock) = engine_for(MockScenario::default().with_window(window), config);

    let capture = engine
        .capture(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(capture.bounds(), Rect::new(108, 131, 384, 261));
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Restore(_))), 1);
}

#[tokio::test]
async fn test_window_closed_between_snapshot_and_capture_is_invalid() {
    let (engine, _) = engine_for(MockScenario::default(), quick_config());

    let error = engine
        .capture(&CaptureRequest::window(WindowHandle(0xdead)), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, CaptureError::InvalidHandle { handle } if handle == WindowHandle(0xdead)));
}

// ============================================================================
// Cursor
// ============================================================================

#[tokio::test]
async fn test_cursor_overlay_relative_to_region() {
    let scenario = MockScenario::default().with_cursor(MockCursor::new(Point::new(500, 500), Point::new(2, 2), true));
    let config = CaptureConfig {
        capture_cursor: true,
        ..quick_config()
    };
    let (engine, _) = engine_for(scenario, config);

    let capture = engine
        .capture(&CaptureRequest::region(Rect::new(200, 200, 600, 600)), &CancellationToken::new())
        .await
        .unwrap();

    let cursor = capture.cursor().expect("cursor overlay");
    assert_eq!(cursor.location, Point::new(298, 298));
    assert!(cursor.visible);
}

#[tokio::test]
async fn test_hidden_cursor_has_no_overlay() {
    let scenario = MockScenario::default().with_cursor(MockCursor::new(Point::new(500, 500), Point::new(2, 2), false));
    let config = CaptureConfig {
        capture_cursor: true,
        ..quick_config()
    };
    let (engine, _) = engine_for(scenario, config);

    let capture = engine
        .capture(&CaptureRequest::full_screen(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(capture.cursor().is_none());
}

#[tokio::test]
async fn test_cursor_not_read_when_disabled() {
    let scenario = MockScenario::default().with_cursor(MockCursor::new(Point::new(5, 5), Point::default(), true));
    let (engine, mock) = engine_for(scenario, quick_config());

    let capture = engine
        .capture(&CaptureRequest::full_screen(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(capture.cursor().is_none());
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::Cursor)), 0);
}

// ============================================================================
// Scenarios and configuration
// ============================================================================

const TWO_MONITOR_SCENARIO: &str = r#"{
    "displays": [
        { "bounds": { "x": 0, "y": 0, "width": 2560, "height": 1440 }, "primary": true },
        { "bounds": { "x": -1920, "y": 360, "width": 1920, "height": 1080 } }
    ],
    "compositor_enabled": true,
    "windows": [
        {
            "handle": 66050,
            "bounds": { "x": -1500, "y": 400, "width": 800, "height": 600 },
            "client_bounds": { "x": -1492, "y": 431, "width": 784, "height": 561 },
            "minimized": false,
            "maximized": false,
            "visible": true,
            "process_id": 7,
            "is_modern_app": false,
            "title": "Report.docx - Word",
            "compositor": { "kind": "surface", "value": { "kind": "bordered", "border": 6 } }
        }
    ],
    "processes": [
        { "pid": 7, "name": "WINWORD.EXE" }
    ],
    "foreground": 66050
}"#;

#[tokio::test]
async fn test_json_scenario_through_engine() {
    let scenario = MockScenario::from_json(TWO_MONITOR_SCENARIO).unwrap();
    let (engine, mock) = engine_for(scenario, quick_config());

    let full = engine
        .capture(&CaptureRequest::full_screen(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(full.bounds(), Rect::new(-1920, 0, 4480, 1440));
    // The strip above the left monitor is not on any screen
    assert_eq!(full.image().unwrap().pixel_format(), PixelFormat::Rgba32);

    let request = CaptureRequest::window(WindowHandle(66050)).with_mode(CaptureMode::CompositorTransparent);
    let (window, trace) = engine
        .capture_traced(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(trace.summary(), "compositor_transparent:succeeded");
    assert_eq!(window.details().title, "Report.docx - Word");
    assert_eq!(window.image().unwrap().pixel_format(), PixelFormat::Rgba32);
    // Already in front: no activation needed
    assert_eq!(mock.call_count(|call| matches!(call, MockCall::BringToForeground(_))), 0);
}

#[test]
fn test_invalid_json_scenario() {
    let error = MockScenario::from_json("{ \"displays\": 3 }").unwrap_err();
    assert!(matches!(error, CaptureError::InvalidParameter { ref parameter, .. } if parameter == "scenario"));
}

#[tokio::test]
async fn test_platform_state_read_on_every_call() {
    let scenario = MockScenario::default().with_window(notepad(1));
    let (engine, mock) = engine_for(scenario, quick_config());
    let request = CaptureRequest::window(WindowHandle(1));

    let (_, first) = engine.capture_traced(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(first.summary(), "gdi:succeeded");

    mock.set_compositor_enabled(true);
    let (_, second) = engine.capture_traced(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(second.summary(), "compositor:declined,gdi:succeeded");

    mock.set_displays(vec![
        DisplayInfo::new(Rect::new(0, 0, 1920, 1080), r"\\.\DISPLAY1", true),
        DisplayInfo::new(Rect::new(1920, 0, 1280, 1024), r"\\.\DISPLAY2", false),
    ]);
    let full = engine
        .capture(&CaptureRequest::full_screen(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(full.bounds(), Rect::new(0, 0, 3200, 1080));
}

/// Configuration that can be swapped between captures
struct SwappableConfig(Mutex<CaptureConfig>);

impl SwappableConfig {
    fn set(&self, config: CaptureConfig) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

impl ConfigSource for SwappableConfig {
    fn current(&self) -> CaptureResult<CaptureConfig> {
        Ok(self.0.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

#[tokio::test]
async fn test_config_read_on_every_call() {
    let mock = Arc::new(MockPlatform::new(MockScenario::default().with_window(notepad(1))));
    let platform = Arc::new(platform_from_mock(Arc::clone(&mock)));
    let config = Arc::new(SwappableConfig(Mutex::new(quick_config())));
    let engine = CaptureEngine::new(platform, Arc::clone(&config) as Arc<dyn ConfigSource>);
    let request = CaptureRequest::window(WindowHandle(1));

    let (_, first) = engine.capture_traced(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(first.resolved, CaptureMode::WindowSpecific);

    config.set(CaptureConfig {
        window_capture_mode: CaptureMode::Screen,
        ..quick_config()
    });
    let (_, second) = engine.capture_traced(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(second.resolved, CaptureMode::Screen);

    config.set(CaptureConfig {
        no_gdi_capture_for: vec!["process-4242".to_string()],
        ..quick_config()
    });
    let (_, third) = engine.capture_traced(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(third.resolved, CaptureMode::Screen);
}

#[tokio::test]
async fn test_broken_config_fails_before_touching_platform() {
    struct Broken;
    impl ConfigSource for Broken {
        fn current(&self) -> CaptureResult<CaptureConfig> {
            Err(CaptureError::ConfigError {
                reason: "unreadable".to_string(),
            })
        }
    }

    let mock = Arc::new(MockPlatform::default());
    let engine = CaptureEngine::new(Arc::new(platform_from_mock(Arc::clone(&mock))), Arc::new(Broken));

    let error = engine
        .capture(&CaptureRequest::full_screen(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, CaptureError::ConfigError { .. }));
    assert!(mock.calls().is_empty());
}

#[test]
fn test_env_config_mode_override() {
    temp_env::with_vars(
        [
            ("SCREENSHOT_ENGINE_CONFIG", None),
            ("SCREENSHOT_ENGINE_WINDOW_CAPTURE_MODE", Some("screen")),
            ("SCREENSHOT_ENGINE_RESTORE_SETTLE_DELAY_MS", Some("0")),
        ],
        || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let mock = Arc::new(MockPlatform::new(MockScenario::default().with_window(notepad(1))));
            let engine = CaptureEngine::new(Arc::new(platform_from_mock(Arc::clone(&mock))), Arc::new(EnvConfig));

            let (_, trace) = runtime
                .block_on(engine.capture_traced(&CaptureRequest::window(WindowHandle(1)), &CancellationToken::new()))
                .unwrap();

            assert_eq!(trace.summary(), "screen:succeeded");
            assert_eq!(print_window_calls(&mock), 0);
        },
    );
}
