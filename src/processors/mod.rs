use crate::domain::payment::ProcessorKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod http;
pub mod mock;

/// Payload sent to a processor's `POST /payments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPaymentRequest {
    pub correlation_id: Uuid,
    pub amount: Decimal,
    pub requested_at: chrono::DateTime<chrono::Utc>,
}

/// Body of `GET /payments/service-health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReading {
    pub failing: bool,
    pub min_response_time: i64,
}

/// Normalized result of one payment call. Timeouts and transport errors are
/// processor failures, never worker failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Accepted,
    Rejected(u16),
    TimedOut,
    Unreachable,
}

impl CallOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CallOutcome::Accepted)
    }
}

#[async_trait::async_trait]
pub trait ProcessorApi: Send + Sync {
    fn kind(&self) -> ProcessorKind;

    async fn send_payment(&self, request: &ProcessorPaymentRequest) -> CallOutcome;

    async fn check_health(&self) -> anyhow::Result<HealthReading>;
}
