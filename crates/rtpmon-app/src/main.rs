//! rtpmon - live RTP monitor dashboard.
//!
//! Connects to the dashboard server's snapshot feed and shows history,
//! daily and forecast charts per pair in the terminal.

use anyhow::Result;
use clap::Parser;
use rtpmon_app::terminal::{InputThread, TerminalBackend};
use rtpmon_app::{AppConfig, DashboardController};
use rtpmon_persistence::FileSelectionStore;
use rtpmon_view::{ChartBackend, LogBackend, SnapshotStore};
use rtpmon_ws::ConnectionConfig;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Live RTP monitor dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RTPMON_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Dashboard server origin, e.g. https://rtp.example.com (overrides config)
    #[arg(long)]
    origin: Option<String>,

    /// Log view updates instead of drawing the terminal dashboard
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    rtpmon_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > RTPMON_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RTPMON_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config_found = Path::new(&config_path).exists();

    let mut config = AppConfig::load(&config_path)?;
    if let Some(origin) = args.origin {
        config.origin = origin;
        config.validate()?;
    }

    // The terminal frontend owns stdout, so logs go to a file there.
    let mut logging = config.logging.clone();
    if !args.headless && logging.file.is_none() {
        logging = logging.with_file(config.terminal_log_path());
    }
    rtpmon_telemetry::init_logging(&logging)?;

    info!("Starting rtpmon v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!(config_path = %config_path, "Config file not found, running with defaults");
    }
    info!(
        config_path = %config_path,
        origin = %config.origin,
        state_dir = %config.state_dir.display(),
        headless = args.headless,
        "Configuration loaded"
    );

    let store = SnapshotStore::open(Box::new(FileSelectionStore::in_dir(&config.state_dir)));
    let connection = config.connection_config()?;

    if args.headless {
        let (_ui_tx, ui_rx) = mpsc::channel(1);
        run(&config, store, LogBackend::new(), connection, ui_rx).await?;
    } else {
        let backend = TerminalBackend::new()?;
        let (ui_tx, ui_rx) = mpsc::channel(32);
        let input = InputThread::spawn(backend.view(), ui_tx);
        let result = run(&config, store, backend, connection, ui_rx).await;
        input.stop();
        result?;
    }

    info!("rtpmon stopped");
    Ok(())
}

async fn run<B: ChartBackend>(
    config: &AppConfig,
    store: SnapshotStore,
    backend: B,
    connection: ConnectionConfig,
    ui_rx: mpsc::Receiver<rtpmon_app::UiEvent>,
) -> Result<()> {
    let mut controller =
        DashboardController::new(store, backend, config.render_options(), config.settle_delay());
    let events = controller.start(connection);
    let result = controller.run(events, ui_rx).await;
    controller.stop().await;
    result?;
    Ok(())
}
