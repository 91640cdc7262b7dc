//! # TagSakay Kiosk
//!
//! Device binary: loads configuration, resolves the device identity, wires
//! the peripherals and runs the scan controller until Ctrl+C.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kiosk Process                                  │
//! │                                                                         │
//! │  stdin ──► ConsoleReader ──► mpsc<KioskEvent> ──► ScanController        │
//! │                                                      │        │         │
//! │                                                      ▼        ▼         │
//! │                                               TagSakay API  LED link    │
//! │                                                                         │
//! │  Logs go to stderr so stdout can carry the LED line protocol.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `kiosk [CONFIG_PATH]`

mod console;
mod system;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tagsakay_device::{
    build_identity, spawn_tag_forwarder, ApiFacade, HttpTransport, KioskConfig, LedMatrix,
    LogDisplay, ScanControllerBuilder, SerialLedMatrix,
};

use crate::console::ConsoleReader;
use crate::system::HostProbe;

/// Pending events before the console blocks.
const EVENT_QUEUE_DEPTH: usize = 32;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting TagSakay kiosk...");

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = KioskConfig::load(config_path)?;
    info!(
        base_url = %config.server.base_url,
        location = %config.device.location,
        "Configuration loaded"
    );

    // Resolve identity
    let network_mac = system::primary_mac_address();
    let identity = build_identity(&config, network_mac.as_deref())?;
    info!(device_id = %identity.device_id(), "Device identity resolved");

    // API client
    let transport = Arc::new(HttpTransport::new(identity.base_url())?);
    let api = ApiFacade::new(
        identity,
        transport,
        config.retry_policy(),
        config.request_timeout(),
    );

    let led = open_led(&config).await?;

    let mut controller = ScanControllerBuilder::new(config)
        .with_api(api)
        .with_display(Box::new(LogDisplay))
        .with_led(led)
        .with_probe(Box::new(HostProbe))
        .build()?;

    // Console stands in for reader and keypad
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    spawn_tag_forwarder(ConsoleReader::new(events_tx.clone()), events_tx);
    controller.mark_reader_initialized(true);

    controller.run(events_rx, shutdown_signal()).await;

    info!("Kiosk shutdown complete");
    Ok(())
}

/// Serial LED link when a port is configured, otherwise LED lines on stdout.
async fn open_led(config: &KioskConfig) -> Result<Box<dyn LedMatrix>, std::io::Error> {
    let Some(port) = &config.peripherals.led_port else {
        info!("No LED port configured, writing LED commands to stdout");
        return Ok(Box::new(SerialLedMatrix::write_only(tokio::io::stdout())));
    };

    // Separate handles keep a pending ACK read from stalling the next write.
    let writer = tokio::fs::OpenOptions::new().write(true).open(port).await?;
    let reader = tokio::fs::File::open(port).await?;
    info!(port = %port.display(), "LED matrix link opened");

    Ok(Box::new(SerialLedMatrix::new(
        writer,
        reader,
        config.led_ack_timeout(),
    )))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping kiosk...");
}
