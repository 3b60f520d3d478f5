//! chatrelay server
//!
//! Stateless chat room instance. Run several behind a load balancer with a
//! shared `--redis-url`; without one it runs single-instance in memory.

use anyhow::Result;
use chatrelay_server::{run_server, AppState, Cli, RelayConfig};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = RelayConfig::load(&cli)?;
    let addr = config.listen_addr()?;
    info!("Configuration loaded successfully");
    info!("Channel: {}", config.channel);
    info!("Key prefix: {}", config.key_prefix);
    info!("History per room: {}", config.max_history);

    let metrics_handle = init_metrics()?;

    let state = AppState::connect(config, Some(metrics_handle)).await?;
    info!("Instance {} ready", state.instance_id);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    run_server(state, addr, shutdown).await
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("chatrelay=debug,chatrelay_server=debug,chatrelay_core=debug,chatrelay_redis=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("chatrelay=info,chatrelay_server=info,chatrelay_core=info,chatrelay_redis=info")
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("chatrelay_messages_total", "Chat messages accepted for relay");
    metrics::describe_counter!("chatrelay_joins_total", "Room joins handled by this instance");
    metrics::describe_counter!(
        "chatrelay_relay_events_total",
        "Relay events published and received by direction"
    );
    metrics::describe_counter!(
        "chatrelay_relay_dropped_total",
        "Relay events lost to publish failures or malformed payloads"
    );
    metrics::describe_counter!(
        "chatrelay_outbound_dropped_total",
        "Events dropped because a connection's outbound queue was full"
    );
    metrics::describe_counter!(
        "chatrelay_store_errors_total",
        "Coordination store failures degraded to empty results"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
