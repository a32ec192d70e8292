use crate::domain::payment::{from_minor_units, PaymentsSummary, ProcessorKind, ProcessorSummary};
use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub correlation_id: Uuid,
    pub amount_minor: i64,
    pub processed_by: ProcessorKind,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The correlation id was already ledgered; redelivery made this call.
    Duplicate,
}

/// Seam for the worker so job-handling logic runs against an in-memory
/// ledger in tests.
#[async_trait::async_trait]
pub trait LedgerSink: Send + Sync {
    async fn record(&self, entry: &NewLedgerEntry) -> Result<InsertOutcome>;
}

#[derive(Clone)]
pub struct LedgerRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl LedgerSink for LedgerRepo {
    async fn record(&self, entry: &NewLedgerEntry) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments_ledger (correlation_id, amount_minor, processed_by, processed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (correlation_id) DO NOTHING
            "#,
        )
        .bind(entry.correlation_id)
        .bind(entry.amount_minor)
        .bind(entry.processed_by.as_str())
        .bind(entry.processed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Duplicate)
        }
    }
}

impl LedgerRepo {
    pub async fn summary(
        &self,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<PaymentsSummary> {
        let rows = sqlx::query(
            r#"
            SELECT processed_by, COUNT(*) AS total_requests, COALESCE(SUM(amount_minor), 0)::bigint AS total_minor
            FROM payments_ledger
            WHERE ($1::timestamptz IS NULL OR processed_at >= $1)
              AND ($2::timestamptz IS NULL OR processed_at <= $2)
            GROUP BY processed_by
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = PaymentsSummary {
            default: empty_summary(),
            fallback: empty_summary(),
        };
        for row in rows {
            let processed_by: String = row.get("processed_by");
            let total_requests: i64 = row.get("total_requests");
            let total_minor: i64 = row.get("total_minor");
            let bucket = ProcessorSummary {
                total_requests,
                total_amount: from_minor_units(total_minor),
            };
            match processed_by.as_str() {
                "default" => summary.default = bucket,
                "fallback" => summary.fallback = bucket,
                other => tracing::warn!("unknown processed_by value in ledger: {}", other),
            }
        }
        Ok(summary)
    }

    pub async fn purge(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM payments_ledger")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn empty_summary() -> ProcessorSummary {
    ProcessorSummary {
        total_requests: 0,
        total_amount: Decimal::ZERO,
    }
}
