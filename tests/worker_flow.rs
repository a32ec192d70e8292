use payment_router::circuit::breaker::CircuitBreaker;
use payment_router::circuit::state::BreakerSettings;
use payment_router::domain::health::{ProcessorHealth, StatusSnapshot};
use payment_router::domain::payment::{PaymentJob, ProcessorKind};
use payment_router::processors::mock::MockProcessor;
use payment_router::processors::CallOutcome;
use payment_router::repo::ledger_repo::{InsertOutcome, LedgerSink, NewLedgerEntry};
use payment_router::worker::pool::{JobOutcome, PaymentHandler};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[tokio::test]
async fn accepted_default_call_ledgers_once() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Accepted]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let job = job(10_000);
    let snapshot = both_healthy(10, 10);
    let outcome = handler
        .process_attempt(&job, Some(&snapshot), chrono::Utc::now())
        .await;

    assert_eq!(outcome, JobOutcome::Ledgered(ProcessorKind::Default));
    assert_eq!(default.call_count(), 1);
    assert_eq!(fallback.call_count(), 0);

    let entries = ledger.entries.lock().unwrap();
    let entry = entries.get(&job.correlation_id).unwrap();
    assert_eq!(entry.amount_minor, 10_000);
    assert_eq!(entry.processed_by, ProcessorKind::Default);
}

#[tokio::test]
async fn failed_default_falls_back_within_same_attempt() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Rejected(500)]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let job = job(10_000);
    let snapshot = both_healthy(10, 10);
    let outcome = handler
        .process_attempt(&job, Some(&snapshot), chrono::Utc::now())
        .await;

    assert_eq!(outcome, JobOutcome::Ledgered(ProcessorKind::Fallback));
    assert_eq!(default.call_count(), 1);
    assert_eq!(fallback.call_count(), 1);
    assert_eq!(handler.default_breaker.consecutive_failures(), 1);

    let entries = ledger.entries.lock().unwrap();
    let entry = entries.get(&job.correlation_id).unwrap();
    assert_eq!(entry.processed_by, ProcessorKind::Fallback);
}

#[tokio::test]
async fn both_failing_snapshot_retries_without_calling_anyone() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Accepted]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let snapshot = StatusSnapshot {
        default: unhealthy(),
        fallback: unhealthy(),
    };
    let outcome = handler
        .process_attempt(&job(10_000), Some(&snapshot), chrono::Utc::now())
        .await;

    assert_eq!(outcome, JobOutcome::RetryLater);
    assert_eq!(default.call_count(), 0);
    assert_eq!(fallback.call_count(), 0);
    assert!(ledger.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_snapshot_retries_later() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Accepted]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let outcome = handler
        .process_attempt(&job(10_000), None, chrono::Utc::now())
        .await;

    assert_eq!(outcome, JobOutcome::RetryLater);
    assert_eq!(default.call_count(), 0);
}

#[tokio::test]
async fn redelivery_never_ledgers_twice() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Accepted]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let job = job(10_000);
    let snapshot = both_healthy(10, 10);
    for _ in 0..3 {
        let outcome = handler
            .process_attempt(&job, Some(&snapshot), chrono::Utc::now())
            .await;
        assert_eq!(outcome, JobOutcome::Ledgered(ProcessorKind::Default));
    }

    assert_eq!(ledger.entries.lock().unwrap().len(), 1);
    assert_eq!(*ledger.inserts.lock().unwrap(), 3);
}

#[tokio::test]
async fn open_default_breaker_routes_to_fallback() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::Accepted]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Accepted]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let now = chrono::Utc::now();
    for _ in 0..5 {
        handler.default_breaker.record_failure(now);
    }

    let snapshot = both_healthy(10, 10);
    let outcome = handler.process_attempt(&job(10_000), Some(&snapshot), now).await;

    assert_eq!(outcome, JobOutcome::Ledgered(ProcessorKind::Fallback));
    assert_eq!(default.call_count(), 0);
    assert_eq!(fallback.call_count(), 1);
}

#[tokio::test]
async fn both_processors_failing_calls_retry_later() {
    let default = mock(ProcessorKind::Default, vec![CallOutcome::TimedOut]);
    let fallback = mock(ProcessorKind::Fallback, vec![CallOutcome::Unreachable]);
    let ledger = Arc::new(MemoryLedger::default());
    let handler = handler(default.clone(), fallback.clone(), ledger.clone());

    let snapshot = both_healthy(10, 10);
    let outcome = handler
        .process_attempt(&job(10_000), Some(&snapshot), chrono::Utc::now())
        .await;

    assert_eq!(outcome, JobOutcome::RetryLater);
    assert_eq!(default.call_count(), 1);
    assert_eq!(fallback.call_count(), 1);
    assert_eq!(handler.default_breaker.consecutive_failures(), 1);
    assert_eq!(handler.fallback_breaker.consecutive_failures(), 1);
    assert!(ledger.entries.lock().unwrap().is_empty());
}

#[derive(Default)]
struct MemoryLedger {
    entries: Mutex<HashMap<Uuid, NewLedgerEntry>>,
    inserts: Mutex<u32>,
}

#[async_trait::async_trait]
impl LedgerSink for MemoryLedger {
    async fn record(&self, entry: &NewLedgerEntry) -> anyhow::Result<InsertOutcome> {
        *self.inserts.lock().unwrap() += 1;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&entry.correlation_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        entries.insert(entry.correlation_id, entry.clone());
        Ok(InsertOutcome::Inserted)
    }
}

fn mock(kind: ProcessorKind, script: Vec<CallOutcome>) -> Arc<MockProcessor> {
    Arc::new(MockProcessor::new(kind, script))
}

fn handler(
    default: Arc<MockProcessor>,
    fallback: Arc<MockProcessor>,
    ledger: Arc<MemoryLedger>,
) -> PaymentHandler {
    let settings = BreakerSettings {
        threshold: 5,
        cooldown: chrono::Duration::seconds(30),
    };
    PaymentHandler {
        default_processor: default,
        fallback_processor: fallback,
        default_breaker: Arc::new(CircuitBreaker::new(ProcessorKind::Default, settings)),
        fallback_breaker: Arc::new(CircuitBreaker::new(ProcessorKind::Fallback, settings)),
        ledger,
    }
}

fn job(amount_minor: i64) -> PaymentJob {
    PaymentJob {
        correlation_id: Uuid::new_v4(),
        amount_minor,
        attempt: 0,
    }
}

fn both_healthy(default_rt: i64, fallback_rt: i64) -> StatusSnapshot {
    StatusSnapshot {
        default: ProcessorHealth {
            failing: false,
            min_response_time_ms: default_rt,
            observed_at: chrono::Utc::now(),
        },
        fallback: ProcessorHealth {
            failing: false,
            min_response_time_ms: fallback_rt,
            observed_at: chrono::Utc::now(),
        },
    }
}

fn unhealthy() -> ProcessorHealth {
    ProcessorHealth {
        failing: true,
        min_response_time_ms: 0,
        observed_at: chrono::Utc::now(),
    }
}
