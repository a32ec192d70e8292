use payment_router::config::AppConfig;
use payment_router::domain::payment::ProcessorKind;
use payment_router::health::monitor::HealthMonitor;
use payment_router::health::store_redis::StatusStore;
use payment_router::processors::http::HttpProcessor;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let redis_client = redis::Client::open(cfg.redis_url.clone())?;

    let monitor = HealthMonitor {
        store: StatusStore::new(redis_client),
        default_processor: Arc::new(HttpProcessor::new(
            ProcessorKind::Default,
            cfg.processor_url_default.clone(),
            cfg.processor_timeout_ms,
            cfg.health_timeout_ms,
        )),
        fallback_processor: Arc::new(HttpProcessor::new(
            ProcessorKind::Fallback,
            cfg.processor_url_fallback.clone(),
            cfg.processor_timeout_ms,
            cfg.health_timeout_ms,
        )),
        poll_interval: std::time::Duration::from_millis(cfg.poll_interval_ms),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    tracing::info!("processor health monitor running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, stopping health monitor");
    let _ = shutdown_tx.send(true);
    let _ = handle.await;

    Ok(())
}
