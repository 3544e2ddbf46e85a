// smsgate gateway -- HTTP front end and one-shot CLI for the SMS queue.
//
// Usage:
//   smsgate-gateway --port /dev/ttyUSB0 serve --listen 0.0.0.0:8080
//   smsgate-gateway --simulator serve
//   smsgate-gateway --config gateway.toml
//   smsgate-gateway --port COM3 status
//   smsgate-gateway --port COM3 send --phone +420123456789 --message "hello"

mod api;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smsgate::{Backend, JobQueue, Modem, QueueConfig};

use crate::config::{GatewayConfig, Overrides};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// SMS gateway for serial GSM modems.
#[derive(Parser)]
#[command(name = "smsgate-gateway", version, about)]
struct Cli {
    /// TOML configuration file. Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, global = true)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Use the built-in simulator instead of a modem.
    #[arg(long, global = true)]
    simulator: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080).
        #[arg(long)]
        listen: Option<String>,

        /// Maximum jobs admitted but not yet finished.
        #[arg(long)]
        queue_size: Option<usize>,
    },

    /// Query the modem once and print its status as JSON.
    Status,

    /// Send one message directly, bypassing the queue.
    Send {
        /// Destination number (e.g. +420123456789).
        #[arg(long)]
        phone: String,

        /// Message text.
        #[arg(long)]
        message: String,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let (listen_addr, queue_size) = match &self.command {
            Some(Command::Serve { listen, queue_size }) => (listen.clone(), *queue_size),
            _ => (None, None),
        };
        Overrides {
            port: self.port.clone(),
            baud_rate: self.baud,
            listen_addr,
            queue_size,
            simulator: self.simulator,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn open_modem(config: &GatewayConfig) -> Result<Arc<dyn Modem>> {
    let backend = if config.simulator {
        Backend::Simulator
    } else {
        Backend::Serial {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
        }
    };
    smsgate::open(&backend).context("failed to set up modem")
}

async fn cmd_serve(config: &GatewayConfig) -> Result<()> {
    if config.simulator {
        info!("using simulated modem");
    } else {
        info!(port = %config.port, baud = config.baud_rate, "using serial modem");
    }

    let modem = open_modem(config)?;
    let queue = Arc::new(JobQueue::new(
        Arc::clone(&modem),
        QueueConfig::with_capacity(config.queue_size),
    ));
    let app = api::router(api::AppState {
        modem,
        queue: Arc::clone(&queue),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, queue_size = config.queue_size, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    queue.shutdown().await;
    info!("gateway stopped");
    Ok(())
}

async fn cmd_status(config: &GatewayConfig) -> Result<()> {
    let modem = open_modem(config)?;
    let status = modem.status().await.context("status query failed")?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn cmd_send(config: &GatewayConfig, phone: &str, message: &str) -> Result<()> {
    let modem = open_modem(config)?;
    let result = modem
        .send_sms(phone, message)
        .await
        .context("send failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(cli.config.as_deref())?.apply(cli.overrides())?;

    match &cli.command {
        None | Some(Command::Serve { .. }) => cmd_serve(&config).await,
        Some(Command::Status) => cmd_status(&config).await,
        Some(Command::Send { phone, message }) => cmd_send(&config, phone, message).await,
    }
}
