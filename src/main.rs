//! # Inky Dashboard Application Entry Point
//!
//! Loads the configuration, sets up logging, picks a display sink and runs the
//! dashboard's two supervised loops until Ctrl-C.
//!
//! ```text
//! inky-dashboard [--stdout] [--once]
//! ```
//!
//! - `--stdout`: print frames to the terminal instead of driving the panel
//! - `--once`: refresh data, show a single frame and exit

// Test modules
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "hardware"))]
mod hardware;

use anyhow::Context;
use inky_dashboard_lib::config::Config;
use inky_dashboard_lib::dashboard::{Dashboard, DataSource};
use inky_dashboard_lib::display::DisplaySink;
use inky_dashboard_lib::layout::{TrueTypeFace, Typeface};
use inky_dashboard_lib::logging;
use inky_dashboard_lib::preview::{PngPreview, TerminalPreview};
use inky_dashboard_lib::render::{load_asset, ViewRenderer};
use inky_dashboard_lib::supervisor::error_chain;
use inky_dashboard_lib::waste::WasteModule;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[cfg(all(target_os = "linux", feature = "hardware"))]
fn open_panel(config: &Config) -> anyhow::Result<Option<Box<dyn DisplaySink>>> {
    let panel = hardware::open_panel(&config.hardware).context("open Inky pHAT")?;
    Ok(Some(Box::new(panel)))
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
fn open_panel(_config: &Config) -> anyhow::Result<Option<Box<dyn DisplaySink>>> {
    warn!("Panel support not built in, rebuild with --features hardware. Writing previews instead");
    Ok(None)
}

/// Choose where frames go.
fn open_sink(config: &Config, stdout_mode: bool) -> anyhow::Result<Box<dyn DisplaySink>> {
    if stdout_mode {
        info!("Printing frames to stdout");
        return Ok(Box::new(TerminalPreview::new(std::io::stdout())));
    }

    if config.enable_inky {
        if let Some(panel) = open_panel(config)? {
            return Ok(panel);
        }
    }

    info!(path = %config.preview_path.display(), "Writing frames to preview file");
    Ok(Box::new(PngPreview::new(&config.preview_path)))
}

async fn run<M, T, K>(mut dashboard: Dashboard<M, T, K>, once: bool) -> anyhow::Result<()>
where
    M: DataSource,
    T: Typeface,
    K: DisplaySink,
{
    if let Err(err) = dashboard.refresh_data().await {
        warn!(error = %error_chain(&err), "Initial data refresh failed");
    }

    if once {
        match dashboard.show_next().context("show frame")? {
            Some(view) => info!(kind = view.kind(), "Frame shown"),
            None => warn!("Nothing to show"),
        }
        return Ok(());
    }

    let running = AtomicBool::new(true);
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down, waiting for the current ticks to finish");
                running.store(false, Ordering::SeqCst);
            }
            Err(err) => warn!(error = %err, "Cannot listen for Ctrl-C"),
        }
    };

    tokio::join!(dashboard.run(&running), shutdown);
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let stdout_mode = env::args().any(|arg| arg == "--stdout");
    let once = env::args().any(|arg| arg == "--once");

    let config_path = Config::path_from_env();
    let config = Config::load(&config_path)
        .with_context(|| format!("load config from {}", config_path.display()))?;

    logging::init(&config.logging).context("initialize logging")?;
    info!("Starting inky-dashboard service...");
    info!(
        working_directory = %env::current_dir().unwrap_or_default().display(),
        config = %config_path.display(),
        log = ?config.logging.path,
        "Configuration loaded"
    );

    let face = TrueTypeFace::load(&config.font_path)
        .with_context(|| format!("load font {}", config.font_path.display()))?;
    let border = load_asset(&config.border_image_path).context("load border image")?;
    let renderer = ViewRenderer::new(
        face,
        border,
        config.color_mode,
        config.color_palette,
        config.flip_screen,
    );

    let waste = WasteModule::new(&config).context("create waste module")?;
    let sink = open_sink(&config, stdout_mode)?;
    let dashboard = Dashboard::new(
        vec![waste],
        renderer,
        sink,
        config.data_interval(),
        config.view_interval(),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    rt.block_on(run(dashboard, once))
}
