//! vouch daemon — entry point for running the coordinator.

mod config;
mod logging;
mod notify;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use config::CoordConfig;
use logging::LogFormat;
use notify::LogOnlyNotifier;
use shutdown::ShutdownController;

use vouch_rpc::{RpcServer, RpcState};
use vouch_session::{CoordMetrics, LifecycleEngine};
use vouch_signaling::{SignalServer, SignalState};
use vouch_store::SessionStore;
use vouch_store_lmdb::{environment::DEFAULT_MAP_SIZE, LmdbSessionStore};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),
}

#[derive(Parser)]
#[command(name = "vouch-daemon", about = "vouch verification-call coordinator")]
struct Cli {
    /// Data directory for session storage.
    #[arg(long, env = "VOUCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "VOUCH_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Signaling WebSocket port.
    #[arg(long, env = "VOUCH_SIGNALING_PORT")]
    signaling_port: Option<u16>,

    /// Public base URL join links are built from.
    #[arg(long, env = "VOUCH_PUBLIC_URL")]
    public_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VOUCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VOUCH_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<CoordConfig, DaemonError> {
        let mut config = match &self.config {
            Some(path) => CoordConfig::from_toml_file(path)?,
            None => CoordConfig::default(),
        };
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(port) = self.signaling_port {
            config.signaling_port = port;
        }
        if let Some(url) = self.public_url {
            config.public_base_url = url;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    logging::init_logging(LogFormat::parse(&config.log_format), &config.log_level);

    tracing::info!(
        data_dir = %config.data_dir.display(),
        rpc_port = config.rpc_port,
        signaling_port = config.signaling_port,
        "starting vouch coordinator"
    );

    let store: Arc<dyn SessionStore> =
        Arc::new(LmdbSessionStore::open(&config.data_dir, DEFAULT_MAP_SIZE)?);
    let metrics = Arc::new(CoordMetrics::new());
    let engine = Arc::new(LifecycleEngine::new(store.clone(), metrics.clone()));

    let rpc_state = Arc::new(RpcState::new(
        store.clone(),
        engine.clone(),
        metrics.clone(),
        config.public_base_url.clone(),
        config.link_ttl_secs,
        Some(Arc::new(LogOnlyNotifier)),
        None,
    ));
    let signal_state = Arc::new(SignalState::new(store, engine, metrics));

    let rpc = RpcServer::new(config.rpc_port, rpc_state);
    let signaling = SignalServer::new(config.signaling_port, signal_state);

    let mut rpc_task = tokio::spawn(async move { rpc.start().await });
    let mut signaling_task = tokio::spawn(async move { signaling.start().await });

    let shutdown = ShutdownController::new();
    tokio::select! {
        _ = shutdown.wait_for_signal() => {}
        result = &mut rpc_task => {
            anyhow::bail!("rpc server exited unexpectedly: {result:?}");
        }
        result = &mut signaling_task => {
            anyhow::bail!("signaling server exited unexpectedly: {result:?}");
        }
    }

    rpc_task.abort();
    signaling_task.abort();
    tracing::info!("vouch coordinator stopped");
    Ok(())
}
