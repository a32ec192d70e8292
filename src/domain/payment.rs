use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Default,
    Fallback,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Default => "default",
            ProcessorKind::Fallback => "fallback",
        }
    }

    pub fn other(&self) -> ProcessorKind {
        match self {
            ProcessorKind::Default => ProcessorKind::Fallback,
            ProcessorKind::Fallback => ProcessorKind::Default,
        }
    }
}

impl std::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion payload, as accepted by `POST /payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub correlation_id: Uuid,
    pub amount: Decimal,
}

/// One queued unit of work. `amount_minor` is fixed-point minor units so the
/// ledger SUM never drifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentJob {
    pub correlation_id: Uuid,
    pub amount_minor: i64,
    #[serde(default)]
    pub attempt: u32,
}

impl PaymentJob {
    pub fn from_request(req: &CreatePaymentRequest) -> Option<Self> {
        to_minor_units(req.amount).map(|amount_minor| Self {
            correlation_id: req.correlation_id,
            amount_minor,
            attempt: 0,
        })
    }
}

pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::from(100)).round().to_i64()
}

pub fn from_minor_units(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, 2)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSummary {
    pub total_requests: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsSummary {
    pub default: ProcessorSummary,
    pub fallback: ProcessorSummary,
}
