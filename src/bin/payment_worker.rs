use payment_router::circuit::breaker::CircuitBreaker;
use payment_router::circuit::state::BreakerSettings;
use payment_router::config::AppConfig;
use payment_router::domain::payment::ProcessorKind;
use payment_router::health::store_redis::StatusStore;
use payment_router::processors::http::HttpProcessor;
use payment_router::queue::redis_stream::JobQueue;
use payment_router::repo::ledger_repo::LedgerRepo;
use payment_router::worker::pool::{run_maintenance, run_worker, PaymentHandler};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let consumer_base =
        std::env::var("WORKER_CONSUMER_NAME").unwrap_or_else(|_| "payment-worker".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&cfg.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let queue = JobQueue {
        client: redis_client.clone(),
        stream_key: cfg.queue_stream_key.clone(),
        group: cfg.queue_group.clone(),
        max_attempts: cfg.max_job_attempts,
        backoff_base_ms: cfg.retry_backoff_ms,
    };
    queue.ensure_group().await?;

    let settings = BreakerSettings {
        threshold: cfg.breaker_threshold,
        cooldown: chrono::Duration::milliseconds(cfg.breaker_cooldown_ms as i64),
    };
    let handler = PaymentHandler {
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
        default_breaker: Arc::new(CircuitBreaker::new(ProcessorKind::Default, settings)),
        fallback_breaker: Arc::new(CircuitBreaker::new(ProcessorKind::Fallback, settings)),
        ledger: Arc::new(LedgerRepo { pool }),
    };
    let status_store = StatusStore::new(redis_client);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..cfg.worker_concurrency {
        tasks.spawn(run_worker(
            handler.clone(),
            queue.clone(),
            status_store.clone(),
            format!("{}-{}", consumer_base, i),
            shutdown_rx.clone(),
        ));
    }
    tasks.spawn(run_maintenance(
        queue.clone(),
        format!("{}-maintenance", consumer_base),
        shutdown_rx.clone(),
    ));
    drop(shutdown_rx);

    tracing::info!(workers = cfg.worker_concurrency, "payment worker pool started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining workers");
    let _ = shutdown_tx.send(true);
    while tasks.join_next().await.is_some() {}

    Ok(())
}
