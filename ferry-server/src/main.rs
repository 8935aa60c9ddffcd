//! ferry server - text and file relay daemon

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;

use ferry_utils::{FerryError, LogConfig, Result};

mod clock;
mod config;
mod connection;
mod disconnect;
mod handler;
mod registry;
mod relay;
mod router;
mod tcp;

use clock::{Clock, SystemClock};
use config::{AppConfig, ConfigLoader};
use registry::ConnectionRegistry;

/// Relay broadcast text, private messages and files between TCP clients
#[derive(Debug, Parser)]
#[command(name = "ferry-server", version)]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/ferry/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,
}

/// State shared by the accept loop and every connection handler
#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<ConnectionRegistry>,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl SharedState {
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            config: Arc::new(config),
            clock,
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        // No receivers just means nothing is listening yet
        let _ = self.shutdown_tx.send(());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app_config = ConfigLoader::load_from(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        app_config.server.bind = bind;
    }
    ConfigLoader::validate(&app_config)?;

    let logging = &app_config.logging;
    let log_config = LogConfig::server(&logging.filter)
        .with_output(logging.output)
        .with_file_name(logging.file_name.as_str());
    ferry_utils::init_logging_with_config(log_config)?;

    info!(
        "ferry server starting ({:?} framing, {:?} broadcast)",
        app_config.protocol.framing, app_config.routing.broadcast
    );

    let state = SharedState::new(app_config, Arc::new(SystemClock));
    let listener = tcp::bind_listener(&state.config.server.bind).await?;
    let accept_loop = tokio::spawn(tcp::run_tcp_accept_loop(listener, state.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    state.shutdown();

    accept_loop
        .await
        .map_err(|e| FerryError::internal(format!("accept loop panicked: {}", e)))?;

    info!("ferry server stopped");
    Ok(())
}
