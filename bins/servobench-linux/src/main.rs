use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servobench_core::{Idle, MotionRoutine, PwmOutput, ServoBank};
use servobench_protocol::ConfigReport;
use servobench_server::{
    config_report, load_mode, save_mode, FileSettings, RunMode, ServerConfig, ServoServer,
};

/// PWM backend for hosts without the peripheral: every commanded pulse is
/// logged instead of written to the bus.
#[derive(Debug, Clone, Copy, Default)]
struct LoggingPwm;

impl PwmOutput for LoggingPwm {
    fn set_channel_pulse(&mut self, channel: usize, pulse: i32) {
        tracing::debug!(channel, pulse, "pwm pulse");
    }

    fn set_frequency(&mut self, hz: u32) {
        tracing::debug!(hz, "pwm frequency");
    }
}

type Bank = ServoBank<LoggingPwm, FileSettings>;
type SharedBank = Arc<RwLock<Bank>>;

fn settings_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".servobench").join("settings.json"),
        None => PathBuf::from("servobench-settings.json"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,servobench_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("servobench starting...");

    let path = settings_path();
    tracing::info!("settings file: {}", path.display());

    let mut bank = ServoBank::new(LoggingPwm, FileSettings::new(path.clone()));
    match bank.restore() {
        Ok(true) => tracing::info!("restored saved calibration"),
        Ok(false) => tracing::info!("no saved calibration, using defaults"),
        Err(err) => tracing::warn!("could not restore calibration: {}", err),
    }

    let mode = load_mode(&FileSettings::new(path.clone())).unwrap_or(RunMode::Calibration);
    tracing::info!("run mode: {:?}", mode);

    let ws_addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let http_addr: SocketAddr = "0.0.0.0:3001".parse()?;

    let server = ServoServer::with_shared(
        ServerConfig {
            name: "servobench".to_string(),
            bind_addr: ws_addr,
        },
        Arc::new(RwLock::new(bank)),
    );
    let bank = server.bank();

    // Command transport only runs in calibration mode; the motion routine
    // takes over in working mode.
    let ws_handle = match mode {
        RunMode::Calibration => tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("command server error: {}", e);
            }
        }),
        RunMode::Working => {
            let bank = bank.clone();
            tokio::spawn(async move {
                run_motion_loop(bank, Idle).await;
            })
        }
    };

    let http_bank = bank.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = start_http_server(http_addr, http_bank).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let cli_bank = bank.clone();
    let cli_path = path.clone();
    let cli_handle = tokio::spawn(async move {
        run_command_line(cli_bank, cli_path, mode).await;
    });

    tracing::info!("servobench ready");
    if mode == RunMode::Calibration {
        tracing::info!("   WebSocket: ws://localhost:3000/ws");
    }
    tracing::info!("   HTTP API:  http://localhost:3001/api/config");
    tracing::info!("type 'help' for the command list");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down...");
        }
        _ = ws_handle => {
            tracing::warn!("command server stopped");
        }
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = cli_handle => {
            tracing::info!("command line closed");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Start the HTTP API server.
async fn start_http_server(addr: SocketAddr, bank: SharedBank) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/api/config", get(config_handler))
        .with_state(bank);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Configuration endpoint handler.
async fn config_handler(State(bank): State<SharedBank>) -> Json<ConfigReport> {
    let bank = bank.read().await;
    Json(config_report(&bank))
}

/// Tick the motion routine at the working-loop rate.
async fn run_motion_loop(bank: SharedBank, mut routine: impl MotionRoutine<LoggingPwm, FileSettings>) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(50));
    loop {
        interval.tick().await;
        let mut bank = bank.write().await;
        routine.tick(&mut bank);
    }
}

/// Interactive command front end on stdin, mirroring the device's serial
/// console.
async fn run_command_line(bank: SharedBank, settings_path: PathBuf, mode: RunMode) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "" => {}
            "status" => {
                let bank = bank.read().await;
                tracing::info!(
                    "mode: {:?}, frequency: {} Hz, {} servos",
                    mode,
                    bank.frequency(),
                    bank.servo_count()
                );
            }
            "save" => {
                let mut bank = bank.write().await;
                match bank.save_all() {
                    Ok(()) => tracing::info!("settings saved"),
                    Err(err) => tracing::error!("save failed: {}", err),
                }
            }
            "calibration" => {
                set_mode(&settings_path, RunMode::Calibration, mode);
            }
            "working" => {
                set_mode(&settings_path, RunMode::Working, mode);
            }
            "help" | "?" => {
                tracing::info!("commands:");
                tracing::info!("  calibration - enable calibration mode (command transport)");
                tracing::info!("  working     - enable working mode (motion routine)");
                tracing::info!("  status      - show current mode and frequency");
                tracing::info!("  save        - persist all settings");
                tracing::info!("  help or ?   - show this help");
            }
            other => {
                tracing::info!("unknown command: {other:?} (try 'help')");
            }
        }
    }
}

/// Persist a mode change for the next boot.
fn set_mode(settings_path: &PathBuf, requested: RunMode, current: RunMode) {
    if requested == current {
        tracing::info!("already in {:?} mode", current);
        return;
    }
    let mut store = FileSettings::new(settings_path.clone());
    match save_mode(&mut store, requested) {
        Ok(()) => tracing::info!("{:?} mode saved, restart to apply", requested),
        Err(err) => tracing::error!("could not save mode: {}", err),
    }
}
