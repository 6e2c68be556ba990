use signalroot::{
    api::{build_router, AppState},
    clock::SystemClock,
    config::Config,
    correlation::InMemoryHistory,
    directory::InMemoryDirectory,
    notifications::build_notifier,
    processing::{CleanupSweeper, CorrelationEngine},
    state::create_stores,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::embedded_defaults()?, Some(e)),
    };

    init_tracing(&config);

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }

    tracing::info!(
        service = %config.observability.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting SignalRoot"
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = signalroot::metrics::init_metrics() {
            tracing::warn!(error = %e, "Failed to initialize metrics, continuing without them");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Initialize idempotency stores
    tracing::info!(backend = ?config.state.backend, "Initializing idempotency stores");
    let stores = create_stores(&config.state, &config.idempotency)?;

    let directory = Arc::new(InMemoryDirectory::with_organizations(&config.organizations));
    let history = Arc::new(InMemoryHistory::new());
    let notifier = build_notifier(&config.notifications)?;
    let clock = Arc::new(SystemClock);

    let engine = Arc::new(CorrelationEngine::new(
        stores.clone(),
        directory,
        history.clone(),
        notifier,
        clock.clone(),
        config.correlation.clone(),
    ));

    // Spawn cleanup sweeper
    let sweeper = Arc::new(CleanupSweeper::new(
        stores,
        history,
        clock,
        config.idempotency.retention(),
        &config.correlation,
        config.idempotency.sweep_interval(),
    ));
    if config.idempotency.sweeper_enabled {
        tokio::spawn(sweeper.clone().run());
    } else {
        tracing::info!("Cleanup sweeper disabled in configuration");
    }

    let state = AppState::new(engine, sweeper)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));
    let app = build_router(state);

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!(address = %http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "signalroot={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
