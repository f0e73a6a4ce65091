//! capture-probe: runs the capture engine and reports what it did
//!
//! Drives [`CaptureEngine`] against either a simulated desktop described by
//! a JSON scenario file or, on Windows, the live desktop, and prints a JSON
//! summary of the capture: which strategies ran, where the bitmap sits and
//! how large it is. Images are not written anywhere.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use screenshot_engine::{
    capture::{
        CaptureEngine, PlatformBackend,
        composite::{default_platform, platform_from_mock},
        mock::{MockPlatform, MockScenario},
        resolver::StrategyResolver,
    },
    config::{CaptureConfig, ConfigSource, EnvConfig},
    model::{CaptureMode, CaptureRequest, ProcessInfo, Rect, WindowHandle},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "capture-probe")]
#[command(about = "Run the capture engine and print which strategies it used")]
struct Cli {
    /// JSON file describing a simulated desktop
    #[arg(long, global = true, conflicts_with = "live")]
    scenario: Option<PathBuf>,
    /// Capture the real desktop (Windows only)
    #[arg(long, global = true)]
    live: bool,
    /// JSON configuration file; defaults to SCREENSHOT_ENGINE_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Attach the pointer overlay
    #[arg(long, global = true)]
    cursor: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one window
    Window {
        /// Window handle, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_handle)]
        handle: WindowHandle,
        /// auto, screen, gdi, compositor or compositor_transparent
        #[arg(long)]
        mode: Option<CaptureMode>,
        /// Title recorded in the capture details
        #[arg(long)]
        title: Option<String>,
    },
    /// Capture a rectangle of the virtual desktop
    Region {
        #[arg(long, allow_negative_numbers = true)]
        x: i32,
        #[arg(long, allow_negative_numbers = true)]
        y: i32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Capture every monitor
    FullScreen,
    /// Show the strategy order for a window without capturing it
    Plan {
        #[arg(long, value_parser = parse_handle)]
        handle: WindowHandle,
        #[arg(long)]
        mode: Option<CaptureMode>,
    },
}

fn parse_handle(raw: &str) -> Result<WindowHandle, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed
        .map(WindowHandle)
        .map_err(|e| format!("invalid window handle '{raw}': {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("screenshot_engine=info,capture_probe=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let platform = Arc::new(load_platform(&cli)?);
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::from_json_file(path)?.apply_env()?,
        None => EnvConfig.current()?,
    };
    if cli.cursor {
        config.capture_cursor = true;
    }
    tracing::info!(platform = platform.name, "capture-probe starting");

    let request = match cli.command {
        Commands::Plan { handle, mode } => {
            let summary = plan(&platform, &config, handle, mode)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        Commands::Window { handle, mode, title } => {
            let mut request = CaptureRequest::window(handle);
            request.mode = mode;
            request.title = title;
            request
        }
        Commands::Region { x, y, width, height } => {
            CaptureRequest::region(Rect::new(x, y, width, height))
        }
        Commands::FullScreen => CaptureRequest::full_screen(),
    };

    let engine = CaptureEngine::with_config(Arc::clone(&platform), config);
    let (capture, trace) = engine
        .capture_traced(&request, &CancellationToken::new())
        .await
        .map_err(|e| {
            let hint = e.remediation_hint().to_string();
            anyhow::Error::new(e).context(hint)
        })?;

    let image = capture.image().context("capture finished without an image")?;
    let summary = json!({
        "platform": platform.name,
        "mode": capture.details().mode,
        "origin": capture.origin(),
        "width": image.width(),
        "height": image.height(),
        "pixel_format": image.pixel_format(),
        "black_percent": image.black_percentage(),
        "cursor": capture.cursor().map(|cursor| json!({
            "location": cursor.location,
            "visible": cursor.visible,
        })),
        "trace": trace,
        "details": capture.details(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_platform(cli: &Cli) -> Result<PlatformBackend> {
    if let Some(path) = &cli.scenario {
        let scenario = MockScenario::from_json_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?;
        return Ok(platform_from_mock(Arc::new(MockPlatform::new(scenario))));
    }
    if cli.live {
        return Ok(default_platform()?);
    }
    bail!("pass --scenario <FILE> for a simulated desktop or --live for the real one")
}

fn plan(
    platform: &PlatformBackend,
    config: &CaptureConfig,
    handle: WindowHandle,
    mode: Option<CaptureMode>,
) -> Result<serde_json::Value> {
    let window = platform.windows.snapshot(handle)?;
    let process = platform
        .processes
        .process_info(window.process_id)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not inspect owning process");
            ProcessInfo {
                pid: window.process_id,
                ..ProcessInfo::default()
            }
        });
    let compositor_enabled = platform.compositor_enabled();
    let requested = mode.unwrap_or(config.window_capture_mode);
    let resolver = StrategyResolver::new(&window, &process, compositor_enabled, config);

    Ok(json!({
        "window": window,
        "process": process,
        "compositor_enabled": compositor_enabled,
        "gdi_legal": resolver.gdi_legal(),
        "compositor_allowed": resolver.compositor_allowed(),
        "prefers_compositor": resolver.prefers_compositor(),
        "requested": requested,
        "plan": resolver.plan(requested),
    }))
}
