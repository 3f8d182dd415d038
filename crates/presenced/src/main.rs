//! Presence daemon
//!
//! Reads an mmWave presence sensor over serial, powers the display down after
//! a period of absence and wakes it instantly when someone arrives. Exposes a
//! small HTTP API for status, manual triggering and disabling.

mod status_server;

use anyhow::{Context, Result};
use clap::Parser;
use mmwave_core::config::{
    DEFAULT_BAUD_RATE, DEFAULT_FALLBACK_PORTS, DEFAULT_OFF_DELAY_SECS, DEFAULT_PORT,
    DEFAULT_SENSITIVITY,
};
use mmwave_core::display::{self, CommandDisplayPower, LogOnlyPower};
use mmwave_core::transport::NativeSerialOpener;
use mmwave_core::{
    DisplayController, DisplayPower, PresenceEngine, SensorConfig, SensorLink, StatusService,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::status_server::ApiState;

/// mmWave presence daemon - display power by occupancy
#[derive(Parser, Debug)]
#[command(name = "presenced")]
#[command(author = "Mirror Presence Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drives display power from an mmWave presence sensor", long_about = None)]
struct Args {
    /// Serial device of the sensor
    #[arg(short, long, env = "PRESENCE_SENSOR_PORT", default_value = DEFAULT_PORT)]
    port: PathBuf,

    /// Devices probed when the port is missing (repeatable)
    #[arg(long = "fallback-port", env = "PRESENCE_FALLBACK_PORTS", value_delimiter = ',')]
    fallback_ports: Vec<PathBuf>,

    /// Serial baud rate
    #[arg(long, env = "PRESENCE_BAUD_RATE", default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// Sensor sensitivity for all gates, 0-100
    #[arg(
        long,
        env = "PRESENCE_SENSITIVITY",
        default_value_t = DEFAULT_SENSITIVITY,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    sensitivity: u8,

    /// Seconds of absence before the display turns off
    #[arg(long, env = "PRESENCE_OFF_DELAY", default_value_t = DEFAULT_OFF_DELAY_SECS)]
    off_delay: u64,

    /// Bind address for the status API
    #[arg(long, env = "PRESENCE_HTTP_BIND", default_value = "127.0.0.1:3721")]
    http_bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log display changes instead of switching the display
    #[arg(long, default_value = "false")]
    no_display_control: bool,
}

impl Args {
    fn sensor_config(&self) -> SensorConfig {
        let fallback_ports = if self.fallback_ports.is_empty() {
            DEFAULT_FALLBACK_PORTS.iter().map(PathBuf::from).collect()
        } else {
            self.fallback_ports.clone()
        };

        let mut config = SensorConfig::default()
            .with_port(self.port.clone())
            .with_fallback_ports(fallback_ports)
            .with_sensitivity(self.sensitivity)
            .with_off_delay(Duration::from_secs(self.off_delay));
        config.baud_rate = self.baud_rate;
        config
    }

    fn display_backends(&self) -> (Arc<dyn DisplayPower>, Option<Arc<dyn DisplayPower>>) {
        if self.no_display_control {
            return (Arc::new(LogOnlyPower), None);
        }
        (
            Arc::new(CommandDisplayPower::vcgencmd()),
            Some(Arc::new(CommandDisplayPower::xset())),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level)?;

    info!("Starting presenced v{}", env!("CARGO_PKG_VERSION"));

    let config = args.sensor_config();
    config.validate().context("Invalid configuration")?;

    let bind_addr: SocketAddr = args
        .http_bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", args.http_bind))?;

    info!(
        "Sensor {} at {} baud, sensitivity {}%, off-delay {}s",
        config.port.display(),
        config.baud_rate,
        config.sensitivity,
        config.off_delay.as_secs()
    );

    let cancel = CancellationToken::new();

    // Display worker: the display is assumed on at startup
    let (primary, fallback) = args.display_backends();
    let controller = Arc::new(DisplayController::new(primary, fallback, true));
    let (display_handle, display_requests) = display::channel();

    let engine = Arc::new(PresenceEngine::new(&config, display_handle));
    let link = Arc::new(SensorLink::new(
        config.clone(),
        Arc::new(NativeSerialOpener),
        engine.clone(),
        cancel.child_token(),
    ));

    // Bind before anything touches the display
    let status = StatusService::new(engine.clone(), link.clone(), &config);
    let (web_addr, server_task) =
        status_server::start(bind_addr, ApiState::new(status, controller.clone()), cancel.clone())
            .await
            .context("Failed to start status API")?;

    let display_task = tokio::spawn(controller.run(display_requests, cancel.clone()));
    let link_task = tokio::spawn({
        let link = link.clone();
        async move { link.run().await }
    });
    let ticker_task = tokio::spawn({
        let engine = engine.clone();
        let cancel = cancel.clone();
        async move { engine.run_ticker(cancel).await }
    });

    println!("============================================");
    println!("Status API: http://{}/api/presence/status", web_addr);
    println!("============================================");

    wait_for_shutdown().await?;
    cancel.cancel();

    join("sensor link", link_task).await;
    join("presence ticker", ticker_task).await;
    join("status API", server_task).await;
    // Last: restores the display if it was off
    join("display worker", display_task).await;

    info!("Shutdown complete");
    Ok(())
}

/// Setup logging with tracing
fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to setup SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}

async fn join(name: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!("{} task failed: {}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["presenced"]).unwrap();
        let config = args.sensor_config();

        assert_eq!(config.port, PathBuf::from("/dev/ttyAMA0"));
        assert_eq!(config.baud_rate, 256_000);
        assert_eq!(config.sensitivity, 40);
        assert_eq!(config.off_delay, Duration::from_secs(60));
        assert_eq!(config.fallback_ports.len(), DEFAULT_FALLBACK_PORTS.len());
        assert_eq!(args.http_bind, "127.0.0.1:3721");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override() {
        let args = Args::try_parse_from([
            "presenced",
            "--port",
            "/dev/ttyUSB1",
            "--fallback-port",
            "/dev/ttyACM0",
            "--fallback-port",
            "/dev/ttyACM1",
            "--baud-rate",
            "115200",
            "--sensitivity",
            "75",
            "--off-delay",
            "120",
        ])
        .unwrap();
        let config = args.sensor_config();

        assert_eq!(config.port, PathBuf::from("/dev/ttyUSB1"));
        assert_eq!(
            config.fallback_ports,
            vec![PathBuf::from("/dev/ttyACM0"), PathBuf::from("/dev/ttyACM1")]
        );
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.sensitivity, 75);
        assert_eq!(config.off_delay, Duration::from_secs(120));
    }

    #[test]
    fn test_sensitivity_range_enforced() {
        assert!(Args::try_parse_from(["presenced", "--sensitivity", "101"]).is_err());
    }

    #[test]
    fn test_display_backends() {
        let args = Args::try_parse_from(["presenced", "--no-display-control"]).unwrap();
        let (primary, fallback) = args.display_backends();
        assert_eq!(primary.name(), "log-only");
        assert!(fallback.is_none());

        let args = Args::try_parse_from(["presenced"]).unwrap();
        let (primary, fallback) = args.display_backends();
        assert_eq!(primary.name(), "vcgencmd");
        assert_eq!(fallback.unwrap().name(), "xset");
    }
}
