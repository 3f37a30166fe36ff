//! hidflow-bridge entry point.
//!
//! Loads the configuration, picks a HID sink, and runs the driver loop until
//! Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! hidflow-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>   TOML configuration file [default: /etc/hidflow/bridge.toml]
//!   --server <URL>    Server address, overrides `bridge.server_url`
//!   --name <NAME>     Screen name, overrides `bridge.client_name`
//!   --dry-run         Log HID reports instead of writing gadget devices
//!   --print-config    Print the effective configuration and exit
//! ```
//!
//! | Variable         | Description                              |
//! |------------------|------------------------------------------|
//! | `HIDFLOW_CONFIG` | Same as `--config`                       |
//! | `HIDFLOW_SERVER` | Same as `--server`                       |
//! | `HIDFLOW_NAME`   | Same as `--name`                         |
//! | `RUST_LOG`       | Log filter, overrides `bridge.log_level` |
//!
//! # Driver loop
//!
//! ```text
//! every tick_interval_ms:
//!   settings = FileConfigSource::current()   (reloads on file change)
//!   match bridge.tick(now, settings)
//!     Connect(endpoint) -> TcpTransport::connect -> bridge.attach
//!                          (abandoned if Ctrl+C arrives first)
//!     _                 -> nothing else to do
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hidflow_bridge::application::driver::{Bridge, ConfigSource, TickOutcome};
use hidflow_bridge::application::forward_input::{ForwardInputUseCase, HidSink};
use hidflow_bridge::application::reconnect::ReconnectManager;
use hidflow_bridge::infrastructure::hid_output::{gadget::GadgetHidSink, LogHidSink};
use hidflow_bridge::infrastructure::network::{until_shutdown, TcpTransport};
use hidflow_bridge::infrastructure::storage::{
    render_config, ConfigOverrides, FileConfigSource,
};
use hidflow_core::OutputCoalescer;

/// Default location of the configuration file.
const DEFAULT_CONFIG_PATH: &str = "/etc/hidflow/bridge.toml";

/// Period of the status line.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Replays keyboard and mouse input from a Synergy, Barrier, or Deskflow
/// server as USB HID reports.
#[derive(Debug, Parser)]
#[command(name = "hidflow-bridge", version)]
struct Cli {
    /// Path of the TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "HIDFLOW_CONFIG")]
    config: PathBuf,

    /// Server address (`host[:port]`, optionally `tcp://`, `synergy://`, or
    /// `deskflow://`). Overrides the configuration file.
    #[arg(long, env = "HIDFLOW_SERVER")]
    server: Option<String>,

    /// Screen name announced to the server. Overrides the configuration file.
    #[arg(long, env = "HIDFLOW_NAME")]
    name: Option<String>,

    /// Log HID reports instead of writing them to the gadget devices.
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            server_url: self.server.clone(),
            client_name: self.name.clone(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut source = FileConfigSource::open(&cli.config, cli.overrides())
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let config = source.config().clone();

    if cli.print_config {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.bridge.log_level)),
        )
        .init();

    info!(config = %source.path().display(), "hidflow-bridge starting");

    // ── HID sink ──────────────────────────────────────────────────────────────
    let sink: Arc<dyn HidSink> = if cli.dry_run {
        info!("dry run: HID reports are logged, not sent");
        Arc::new(LogHidSink)
    } else {
        let gadget = GadgetHidSink::new(&config.hid.keyboard_device, &config.hid.mouse_device);
        info!(
            keyboard = %gadget.keyboard_path().display(),
            mouse = %gadget.mouse_path().display(),
            "using USB gadget devices"
        );
        Arc::new(gadget)
    };

    let input = ForwardInputUseCase::new(sink, OutputCoalescer::new(config.hid.report_interval()));
    let reconnect = ReconnectManager::new(config.bridge.reconnect_interval());
    let mut bridge: Bridge<TcpTransport> = Bridge::new(input, reconnect);

    // ── Graceful shutdown signal ──────────────────────────────────────────────
    let (stop, mut shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                stop.send_replace(true);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Driver loop ───────────────────────────────────────────────────────────
    let connect_timeout = config.bridge.connect_timeout();
    let mut ticker = tokio::time::interval(config.bridge.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_heartbeat = Instant::now();

    while !*shutdown.borrow() {
        ticker.tick().await;
        let now = Instant::now();

        if let TickOutcome::Connect(endpoint) = bridge.tick(now, source.current()) {
            let attempt = TcpTransport::connect(&endpoint, connect_timeout);
            match until_shutdown(attempt, &mut shutdown).await {
                Some(Ok(transport)) => bridge.attach(transport),
                Some(Err(err)) => warn!(%endpoint, error = %err, "connection attempt failed"),
                None => break,
            }
        }

        if now.saturating_duration_since(last_heartbeat) >= HEARTBEAT_INTERVAL {
            last_heartbeat = now;
            let status = bridge.status();
            info!(
                endpoint = %status.endpoint.as_ref().map(ToString::to_string).unwrap_or_default(),
                connected = status.connected,
                session = ?status.session,
                host_connected = status.host_connected,
                frames = status.frames.frames,
                oversized = status.frames.oversized_frames,
                "status"
            );
        }
    }

    bridge.shutdown();
    info!("hidflow-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
