use crate::domain::payment::{CreatePaymentRequest, PaymentJob};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Accepts and enqueues; never waits for processing.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    if req.amount <= Decimal::ZERO {
        return (StatusCode::UNPROCESSABLE_ENTITY, "amount must be > 0").into_response();
    }
    let Some(job) = PaymentJob::from_request(&req) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "amount out of range").into_response();
    };

    match state.queue.enqueue(&job).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(err) => {
            tracing::error!(correlation_id = %req.correlation_id, "enqueue failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryWindow {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

/// `?from=&to=` means an unbounded window, not a parse error.
fn empty_as_none<'de, D>(
    deserializer: D,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub async fn payments_summary(
    State(state): State<AppState>,
    Query(window): Query<SummaryWindow>,
) -> impl IntoResponse {
    match state.ledger.summary(window.from, window.to).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => {
            tracing::error!("summary query failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Test/reset utility.
pub async fn purge_payments(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.purge().await {
        Ok(deleted) => {
            tracing::info!(deleted, "ledger purged");
            StatusCode::OK.into_response()
        }
        Err(err) => {
            tracing::error!("ledger purge failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    StatusCode::OK
}
