//! SecuLock daemon - main entry point
//!
//! Claims the board's pins, wires the configured devices and runs the
//! controller until SIGINT or SIGTERM.

mod wiring;

use anyhow::{Context, Result};
use clap::Parser;
use seculock_controller::{Controller, ControllerConfig, SMTP_PASSWORD_ENV};
use seculock_core::SystemClock;
use seculock_hardware::Camera;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "seculock")]
#[command(about = "Smart locker controller: face check, mailed OTP and tamper alarm")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, short, default_value = "/etc/seculock/seculock.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "seculock=info,seculock_controller=info,seculock_hardware=info,\
                     seculock_notify=info,seculock_otp=info,seculock_face=info"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting SecuLock v{}", seculock_core::VERSION);

    let mut config = ControllerConfig::from_toml(
        &std::fs::read_to_string(&cli.config)
            .with_context(|| format!("reading {}", cli.config.display()))?,
    )?;
    config.apply_password_override(std::env::var(SMTP_PASSWORD_ENV).ok());
    config.validate().context("invalid configuration")?;

    if cli.check_config {
        println!("{}: configuration is valid", cli.config.display());
        return Ok(());
    }

    let mut hardware = wiring::acquire_hardware(&config)?;
    let peripherals = wiring::peripherals(&config, &hardware)?;
    match peripherals.camera.get_info().await {
        Ok(camera) => info!(%camera, "camera configured"),
        Err(e) => warn!(error = %e, "camera did not report its identity"),
    }
    let controller =
        Controller::assemble(&config, &hardware, peripherals, Arc::new(SystemClock)).await?;

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(wait_for_signal(shutdown.clone()));

    let report = controller.run(shutdown).await;
    signals.abort();
    info!(
        sessions = report.sessions,
        granted = report.granted,
        denied = report.denied,
        intrusions = report.intrusions,
        "SecuLock shutting down"
    );

    if let Err(e) = hardware.release() {
        error!(error = %e, "hardware release incomplete");
    }
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "cannot install signal handlers, falling back to ctrl-c");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received ctrl-c");
                }
                shutdown.cancel();
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    shutdown.cancel();
}
