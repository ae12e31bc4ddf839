//! `camwall` — terminal camera wall with bus discovery.
//!
//! Renders every tracked camera as one tile of a recursively split grid,
//! discovers new cameras from announcements on a publish/subscribe bus,
//! and tracks each feed's health (loading/online/offline + FPS) live.
//!
//! Logs go to a file (default `/tmp/camwall.log`) to avoid corrupting
//! the terminal UI.
//!
//! Entry point: CLI parsing, tracing setup, panic hooks, wall assembly.

mod action;
mod app;
mod data_bridge;
mod demo;
mod event;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use camwall_config::FileStore;
use camwall_core::store::{MemoryStore, Persistence};
use camwall_core::{CameraStore, Wall};
use camwall_net::{BusConfig, ConnectionStatus, HttpFrameSource, MemoryBroker};

use crate::app::App;

/// Terminal camera wall: tiled live feeds with bus discovery.
#[derive(Parser, Debug)]
#[command(name = "camwall", version, about)]
struct Cli {
    /// Broker URL (e.g., ws://127.0.0.1:8883)
    #[arg(short = 'b', long, env = "CAMWALL_BROKER_URL")]
    broker_url: Option<String>,

    /// Discovery topic
    #[arg(short = 't', long, env = "CAMWALL_TOPIC")]
    topic: Option<String>,

    /// Client ID presented to the broker
    #[arg(long, env = "CAMWALL_CLIENT_ID")]
    client_id: Option<String>,

    /// Run against an in-process broker with simulated camera
    /// announcements; nothing is persisted to disk.
    #[arg(long)]
    demo: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/camwall.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application so logs flush on exit.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "camwall={log_level},camwall_core={log_level},camwall_net={log_level}"
        ))
    });

    let log_dir = cli.log_file.parent().unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("camwall.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Effective bus settings: CLI flags > runtime-saved settings > config file.
fn resolve_bus_config(cli: &Cli, persistence: &dyn Persistence) -> Result<BusConfig> {
    let mut config = match camwall_config::persisted_bus_config(persistence) {
        Some(saved) => saved,
        None => camwall_config::load_config_or_default()
            .bus
            .to_bus_config()?,
    };

    if let Some(ref url) = cli.broker_url {
        config.broker_url = url
            .parse()
            .map_err(|e| eyre!("invalid broker URL '{url}': {e}"))?;
    }
    if let Some(ref topic) = cli.topic {
        config.topic = topic.clone();
    }
    if let Some(ref client_id) = cli.client_id {
        config.client_id = client_id.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    info!(demo = cli.demo, "starting camwall");

    // Demo mode stays in memory so it never clobbers the real wall.
    let persistence: Arc<dyn Persistence> = if cli.demo {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open_default()?)
    };

    let store = Arc::new(CameraStore::load(Arc::clone(&persistence))?);
    let wall = Wall::new(store);

    let bus_config = resolve_bus_config(&cli, persistence.as_ref())?;
    if !cli.demo {
        if let Err(e) = camwall_config::save_bus_config(persistence.as_ref(), &bus_config) {
            warn!(error = %e, "could not save bus settings");
        }
    }

    if cli.demo {
        let broker = MemoryBroker::new();
        let topic = bus_config.topic.clone();
        wall.start_discovery(bus_config, Arc::clone(&broker)).await;

        // Hold the announcers until the subscription is live.
        if let Some(mut status) = wall.bus_status().await {
            while *status.borrow() != ConnectionStatus::Connected {
                if status.changed().await.is_err() {
                    break;
                }
            }
        }
        demo::spawn_announcers(&broker, &topic);
    } else {
        // The socket bus transport ships with the deployment; without one
        // the wall still renders every persisted camera.
        warn!("no bus transport available — discovery idle (try --demo)");
    }

    let feed = camwall_config::load_config_or_default().feed;
    let source = HttpFrameSource::new(Duration::from_millis(feed.poll_interval_ms));

    let mut app = App::new(wall.clone(), source);
    let result = app.run().await;

    wall.stop_discovery().await;
    result
}
