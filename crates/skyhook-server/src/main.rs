//! # skyhook-server
//!
//! HTTP server and daemon entry point for the skyhook field recovery tool.
//!
//! This binary provides:
//! - The always-on monitors (device presence, buttons, bridge supervision)
//! - REST API for status, triggers, and dump retrieval
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package skyhook-server
//!
//! # Production (on the field device)
//! SKYHOOK_ENV=production ./skyhook-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use skyhook_core::{
    BridgeSupervisor, ButtonInput, ButtonMonitor, CloudSync, ConnectionState, DeviceMonitor,
    DumpStore, FixedButtonInput, ModeController, NoCloudSync, NullIndicators, Orchestrator,
    RadioControl, RcloneSync, SkyhookConfig, SocatBridge, SysfsButtonInput, SystemSerialOpener,
    WorkerTimings,
};

use skyhook_server::state::AppState;
use skyhook_server::{api, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("SKYHOOK_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);
    logging::init(is_production)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting skyhook-server");

    // Configuration is loaded once; edits require a restart.
    let config = match std::env::var("SKYHOOK_CONFIG") {
        Ok(path) => SkyhookConfig::load_from(PathBuf::from(path))?,
        Err(_) => SkyhookConfig::load()?,
    };
    let config = Arc::new(config);

    let controller = Arc::new(ModeController::new(ConnectionState::absent(
        config.serial.port.clone(),
        config.serial.baud,
    )));

    let dumps = Arc::new(DumpStore::new(config.dump.directory.clone()));
    if let Err(e) = dumps.ensure_dir() {
        warn!(error = %e, dir = %config.dump.directory.display(), "could not create dump directory");
    }

    // Hardware capabilities, with a degraded fallback for machines without
    // GPIO access so development does not need the physical device.
    let buttons: Arc<dyn ButtonInput> = match SysfsButtonInput::new(
        config.hardware.button_dump_pin,
        config.hardware.button_pair_pin,
    ) {
        Ok(input) => Arc::new(input),
        Err(e) => {
            warn!(error = %e, "GPIO unavailable, physical buttons disabled");
            Arc::new(FixedButtonInput::default())
        }
    };

    #[cfg(feature = "bluetooth")]
    let radio: Arc<dyn RadioControl> = Arc::new(skyhook_core::BluerRadio);
    #[cfg(not(feature = "bluetooth"))]
    let radio: Arc<dyn RadioControl> = Arc::new(skyhook_core::UnavailableRadio);

    let cloud: Arc<dyn CloudSync> = if config.cloud.enabled {
        Arc::new(RcloneSync::new(config.cloud.remote.clone()))
    } else {
        Arc::new(NoCloudSync)
    };

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&controller),
        Arc::new(SystemSerialOpener),
        radio,
        cloud,
        Arc::clone(&dumps),
        WorkerTimings {
            silence_threshold: config.silence_threshold(),
            read_timeout: config.read_timeout(),
            pairing_window: config.pairing_window(),
        },
    ));

    // Monitor tasks observe one shutdown channel; flipping it ends every
    // loop and lets the bridge supervisor stop its child within the grace.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let device_monitor = DeviceMonitor::new(
        Arc::clone(&controller),
        config.serial.port.clone(),
        config.serial.baud,
        Duration::from_millis(config.dump.device_poll_ms),
    );
    let button_monitor = ButtonMonitor::new(
        buttons,
        Arc::clone(&controller),
        Arc::clone(&orchestrator),
        Duration::from_millis(config.hardware.button_poll_ms),
        Duration::from_millis(config.hardware.debounce_ms),
    );
    let bridge_supervisor = BridgeSupervisor::new(
        Arc::clone(&controller),
        SocatBridge::default(),
        config.bridge.tcp_port,
        Duration::from_millis(config.bridge.poll_ms),
        Duration::from_secs(config.bridge.stop_grace_secs),
    );

    let workers = vec![
        tokio::spawn(device_monitor.run(shutdown_rx.clone())),
        tokio::spawn(button_monitor.run(shutdown_rx.clone())),
        tokio::spawn(bridge_supervisor.run(shutdown_rx)),
    ];

    let app_state = AppState {
        config: Arc::clone(&config),
        controller,
        orchestrator,
        dumps,
        indicators: Arc::new(NullIndicators),
    };
    let app = api::create_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_addr, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping monitors");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }
    info!("Shutdown complete");
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating shutdown...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Ctrl+C handler");
        info!("Received Ctrl+C, initiating shutdown...");
    }
}
