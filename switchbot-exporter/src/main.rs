//! Prometheus exporter for SwitchBot devices.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use switchbot_client::{DeviceClient, SwitchBotClient};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use switchbot_exporter::config::{LogFormat, Overrides};
use switchbot_exporter::{
    AppState, DeviceLabelCache, ExporterConfig, HttpServer, ReloadCoordinator,
};

/// Prometheus exporter for SwitchBot devices.
#[derive(Parser, Debug)]
#[command(name = "switchbot-exporter")]
#[command(about = "Export SwitchBot device readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The address to listen on for HTTP requests.
    #[arg(long = "web.listen-address")]
    listen_address: Option<String>,

    /// The open token for the SwitchBot API.
    #[arg(long = "switchbot.open-token")]
    open_token: Option<String>,

    /// The secret key for the SwitchBot API.
    #[arg(long = "switchbot.secret-key")]
    secret_key: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    config.apply_overrides(Overrides {
        listen: args.listen_address,
        open_token: args.open_token,
        secret_key: args.secret_key,
        log_level: args.log_level,
    });
    config.apply_env(|key| std::env::var(key).ok());

    init_logging(&config)?;

    config.validate()?;
    let listen_addr = config.http.listen_addr()?;

    info!("Starting SwitchBot exporter");

    let client: Arc<dyn DeviceClient> = Arc::new(SwitchBotClient::with_options(
        config.switchbot.credentials(),
        &config.switchbot.base_url,
        config.switchbot.request_timeout(),
    )?);

    #[cfg(unix)]
    let hangup = switchbot_exporter::reload::hangup_signal()?;

    // The roster must be populated before serving.
    let cache = Arc::new(DeviceLabelCache::with_pruning(config.cache.prune_on_reload));
    cache
        .refresh(client.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("getting device list: {}", e))?;

    let (reload, reload_task) = ReloadCoordinator::spawn(cache.clone(), client.clone());

    #[cfg(unix)]
    let hangup_task = tokio::spawn(switchbot_exporter::reload::watch_hangup(
        hangup,
        reload.clone(),
    ));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(AppState::new(client, cache, reload), listen_addr);
    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    // Wait for a shutdown signal or for the server to fail
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = &mut http_task => {
            reload_task.abort();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for in-flight requests to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    #[cfg(unix)]
    hangup_task.abort();
    reload_task.abort();

    info!("Exporter stopped");
    Ok(())
}

fn init_logging(config: &ExporterConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

async fn terminate() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
