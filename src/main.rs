use axum::routing::{get, post};
use axum::Router;
use payment_router::config::AppConfig;
use payment_router::http::handlers::payments;
use payment_router::queue::redis_stream::JobQueue;
use payment_router::repo::ledger_repo::LedgerRepo;
use payment_router::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let queue = JobQueue {
        client: redis_client,
        stream_key: cfg.queue_stream_key.clone(),
        group: cfg.queue_group.clone(),
        max_attempts: cfg.max_job_attempts,
        backoff_base_ms: cfg.retry_backoff_ms,
    };
    queue.ensure_group().await?;

    let state = AppState {
        queue,
        ledger: LedgerRepo { pool },
    };

    let app = Router::new()
        .route(
            "/payments",
            post(payments::create_payment).delete(payments::purge_payments),
        )
        .route("/payments-summary", get(payments::payments_summary))
        .route("/healthcheck", get(payments::healthcheck))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("ingestion api listening on {}", cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
