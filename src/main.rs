mod adapters;
mod application;
mod config;
mod domain;
mod error;
mod interface;
mod ports;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{SysfsConfig, SysfsCounterSource};
use application::{MonitoringService, SessionStore, SpeedSampler, StorageStatus};
use config::Config;
use interface::http::create_router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wifimon={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting wifimon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);

    // Initialize adapters
    let sysfs = match &config.sys_path {
        Some(path) => SysfsCounterSource::new(SysfsConfig::new(path.clone())),
        None => SysfsCounterSource::with_default_paths(),
    };
    let source: Arc<dyn ports::CounterSource> = Arc::new(sysfs);

    let sampler = match SpeedSampler::new(source.clone(), config.interface.clone(), config.history_size) {
        Ok(sampler) => sampler,
        Err(e) => {
            error!("✗ {}", e);
            return Err(e.into());
        }
    };
    info!("✓ Sampling interface {}", config.interface);

    let store = Arc::new(SessionStore::new(config.history_size, config.data_dir.clone()));
    if let StorageStatus::Unavailable(reason) = store.storage_status() {
        warn!("⚠ Session storage unavailable ({}). Recording in memory only.", reason);
    }

    // Create monitoring service and its sampling loop
    let monitoring_service = Arc::new(MonitoringService::new(source, sampler, store.clone()));
    if config.autostart {
        monitoring_service.start()?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampling = tokio::spawn(monitoring_service.clone().run(config.poll_interval, shutdown_rx));

    info!("✓ Monitoring service initialized");

    // Create HTTP server
    let app = create_router(monitoring_service);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ wifimon listening on {}", addr);
    info!("  → API: http://localhost:{}/api/speed", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;

    if shutdown_tx.send(true).is_err() {
        debug!("Sampling loop already exited");
    }
    sampling.await?;

    if config.save_on_exit && !store.is_empty() {
        let store = store.clone();
        match tokio::task::spawn_blocking(move || store.save(None)).await? {
            Ok(path) => info!("✓ Session saved to {}", path.display()),
            Err(e) => error!("✗ Error saving data: {}", e),
        }
    }

    Ok(())
}
