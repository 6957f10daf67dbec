//! WatchFleet Control Plane Server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use watchfleet_client::AggregatorClient;
use watchfleet_control_plane::actuator::HostActuatorProvider;
use watchfleet_control_plane::boundary::ResultOutbox;
use watchfleet_control_plane::{http, AppState, Config, Scheduler};

/// WatchFleet control plane server.
#[derive(Parser, Debug)]
#[command(name = "watchfleet", about = "WatchFleet device fleet control plane")]
struct Args {
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<String>,

    /// Aggregator base URL
    #[arg(long)]
    aggregator_url: Option<String>,

    /// Aggregator API key
    #[arg(long)]
    api_key: Option<String>,

    /// Device automation host base URL
    #[arg(long)]
    host_url: Option<String>,

    /// Seed for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Failed attempts allowed per task
    #[arg(long)]
    max_retries: Option<u32>,

    /// Do not start dispatching until POST /v1/scheduler/start
    #[arg(long)]
    no_autostart: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.http_addr {
            config.http_bind_addr = addr;
        }
        if let Some(url) = self.aggregator_url {
            config.aggregator_url = Some(url);
        }
        if let Some(key) = self.api_key {
            config.aggregator_api_key = Some(key);
        }
        if let Some(url) = self.host_url {
            config.automation_host_url = url;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if self.no_autostart {
            config.autostart = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("watchfleet=info".parse()?))
        .with_target(true)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let http_addr: SocketAddr = config.http_bind_addr.parse()?;
    let state = AppState::new(&config);
    let actuators = Arc::new(HostActuatorProvider::new(&config.automation_host_url));
    let background = CancellationToken::new();

    let mut scheduler = Scheduler::new(state.clone(), config.clone(), actuators);
    let mut outbox_handle = None;
    match &config.aggregator_url {
        Some(url) => {
            let mut client = AggregatorClient::new(url);
            if let Some(key) = &config.aggregator_api_key {
                client = client.with_api_key(key.clone());
            }
            let client = Arc::new(client);
            let (outbox, handle) = ResultOutbox::spawn(
                client.clone(),
                config.report_backoff(),
                config.report_max_attempts,
                background.clone(),
            );
            outbox_handle = Some(handle);
            scheduler = scheduler.with_source(client).with_outbox(outbox);
            info!(aggregator = %url, "Aggregator configured");
        }
        None => warn!("No aggregator configured - queue is fed through the API only"),
    }
    let scheduler = Arc::new(scheduler);

    // Offline sweep for devices that stopped sending heartbeats
    let sweeper = {
        let state = state.clone();
        let token = background.clone();
        let period = config.heartbeat_timeout().max(std::time::Duration::from_secs(1)) / 2;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let stale = state.fleet.sweep_stale(Utc::now()).await;
                        if !stale.is_empty() {
                            warn!(count = stale.len(), "Devices marked offline");
                        }
                    }
                }
            }
        })
    };

    if config.autostart {
        scheduler.start().await;
    }

    info!(http_addr = %http_addr, "Starting WatchFleet control plane");
    let listener = TcpListener::bind(http_addr).await?;
    let router = http::create_router(scheduler.clone());
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
        })
        .await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server error");
    }

    scheduler.stop().await;
    background.cancel();
    let _ = sweeper.await;
    if let Some(handle) = outbox_handle {
        let _ = handle.await;
    }

    info!("WatchFleet control plane stopped");
    served?;
    Ok(())
}
