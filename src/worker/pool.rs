use crate::circuit::breaker::CircuitBreaker;
use crate::domain::health::StatusSnapshot;
use crate::domain::payment::{from_minor_units, PaymentJob, ProcessorKind};
use crate::health::store_redis::StatusStore;
use crate::processors::{ProcessorApi, ProcessorPaymentRequest};
use crate::queue::redis_stream::{JobQueue, RetryDisposition};
use crate::repo::ledger_repo::{InsertOutcome, LedgerSink, NewLedgerEntry};
use std::sync::Arc;
use tokio::sync::watch;

/// What one delivery of a job resolved to. The queue adapter maps this to
/// ack / retry-with-backoff / drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Ledgered(ProcessorKind),
    RetryLater,
    Drop(String),
}

/// Routing-and-settlement logic for a single job attempt, shared by every
/// worker in the pool.
#[derive(Clone)]
pub struct PaymentHandler {
    pub default_processor: Arc<dyn ProcessorApi>,
    pub fallback_processor: Arc<dyn ProcessorApi>,
    pub default_breaker: Arc<CircuitBreaker>,
    pub fallback_breaker: Arc<CircuitBreaker>,
    pub ledger: Arc<dyn LedgerSink>,
}

impl PaymentHandler {
    fn processor(&self, kind: ProcessorKind) -> &dyn ProcessorApi {
        match kind {
            ProcessorKind::Default => self.default_processor.as_ref(),
            ProcessorKind::Fallback => self.fallback_processor.as_ref(),
        }
    }

    fn breaker(&self, kind: ProcessorKind) -> &CircuitBreaker {
        match kind {
            ProcessorKind::Default => &self.default_breaker,
            ProcessorKind::Fallback => &self.fallback_breaker,
        }
    }

    /// One delivery: route, call the chosen processor, fall back to the other
    /// within the same attempt, requeue only when neither succeeded.
    pub async fn process_attempt(
        &self,
        job: &PaymentJob,
        snapshot: Option<&StatusSnapshot>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> JobOutcome {
        let Some(first) = crate::router::select(
            snapshot,
            !self.default_breaker.allows(now),
            !self.fallback_breaker.allows(now),
        ) else {
            tracing::debug!(correlation_id = %job.correlation_id, "no processor viable");
            return JobOutcome::RetryLater;
        };

        if let Some(outcome) = self.call_and_ledger(first, job, now).await {
            return outcome;
        }

        // First choice failed; the snapshot is what we have, so only the
        // breaker gate is re-checked for the other side.
        let second = first.other();
        let second_usable = snapshot
            .is_some_and(|s| !s.get(second).failing && self.breaker(second).allows(now));
        if second_usable {
            if let Some(outcome) = self.call_and_ledger(second, job, now).await {
                return outcome;
            }
        }

        JobOutcome::RetryLater
    }

    /// `Some(outcome)` when the processor accepted; `None` means this
    /// processor failed and the caller may try the other one.
    async fn call_and_ledger(
        &self,
        kind: ProcessorKind,
        job: &PaymentJob,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<JobOutcome> {
        let request = ProcessorPaymentRequest {
            correlation_id: job.correlation_id,
            amount: from_minor_units(job.amount_minor),
            requested_at: now,
        };

        let call = self.processor(kind).send_payment(&request).await;
        if !call.is_accepted() {
            tracing::warn!(
                correlation_id = %job.correlation_id,
                processor = %kind,
                outcome = ?call,
                "processor call failed"
            );
            self.breaker(kind).record_failure(now);
            return None;
        }

        self.breaker(kind).record_success();

        let entry = NewLedgerEntry {
            correlation_id: job.correlation_id,
            amount_minor: job.amount_minor,
            processed_by: kind,
            processed_at: now,
        };
        match self.ledger.record(&entry).await {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!(correlation_id = %job.correlation_id, processor = %kind, "payment ledgered");
                Some(JobOutcome::Ledgered(kind))
            }
            Ok(InsertOutcome::Duplicate) => {
                // Redelivery of an already-settled job; the unique key did
                // its job.
                tracing::debug!(correlation_id = %job.correlation_id, "duplicate ledger insert ignored");
                Some(JobOutcome::Ledgered(kind))
            }
            Err(err) => {
                // The processor accepted but the ledger write failed; retry
                // later and let the unique key absorb the replay.
                tracing::error!(correlation_id = %job.correlation_id, "ledger insert failed: {}", err);
                Some(JobOutcome::RetryLater)
            }
        }
    }
}

/// One worker task: claim, decode, process, signal the queue.
pub async fn run_worker(
    handler: PaymentHandler,
    queue: JobQueue,
    status_store: StatusStore,
    consumer: String,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let delivery = tokio::select! {
            claimed = queue.claim(&consumer, 2_000) => claimed,
            _ = shutdown.changed() => {
                tracing::info!(consumer = %consumer, "worker stopping");
                return;
            }
        };

        let delivery = match delivery {
            Ok(Some(d)) => d,
            Ok(None) => continue,
            Err(err) => {
                tracing::error!(consumer = %consumer, "claim failed: {}", err);
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };

        let outcome = match serde_json::from_str::<PaymentJob>(&delivery.raw) {
            Ok(job) => {
                let snapshot = match status_store.get_snapshot().await {
                    Ok(s) => s,
                    Err(err) => {
                        // Unreadable snapshot means neither processor is
                        // trusted this attempt.
                        tracing::warn!("status snapshot unavailable: {}", err);
                        None
                    }
                };
                let outcome = handler
                    .process_attempt(&job, snapshot.as_ref(), chrono::Utc::now())
                    .await;
                settle(&queue, &delivery.id, &job, outcome.clone()).await;
                outcome
            }
            Err(err) => {
                // Retrying cannot fix a decode failure.
                let reason = format!("malformed job payload: {}", err);
                if let Err(ack_err) = queue.ack(&delivery.id).await {
                    tracing::error!("ack of malformed job failed: {}", ack_err);
                }
                JobOutcome::Drop(reason)
            }
        };

        if let JobOutcome::Drop(reason) = outcome {
            tracing::warn!(delivery_id = %delivery.id, "job dropped: {}", reason);
        }
    }
}

async fn settle(queue: &JobQueue, delivery_id: &str, job: &PaymentJob, outcome: JobOutcome) {
    let result = match outcome {
        JobOutcome::Ledgered(_) => queue.ack(delivery_id).await,
        // Decode-failure drops are acked inline in run_worker (there is no
        // decoded job to pass here); this arm keeps the mapping total.
        JobOutcome::Drop(_) => queue.ack(delivery_id).await,
        JobOutcome::RetryLater => {
            match queue.retry_later(delivery_id, job, chrono::Utc::now()).await {
                Ok(RetryDisposition::Requeued { delay_ms }) => {
                    tracing::info!(
                        correlation_id = %job.correlation_id,
                        attempt = job.attempt,
                        delay_ms,
                        "job requeued"
                    );
                    Ok(())
                }
                Ok(RetryDisposition::AttemptsExhausted) => {
                    tracing::error!(
                        correlation_id = %job.correlation_id,
                        attempts = job.attempt + 1,
                        "payment unprocessable, attempts exhausted"
                    );
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
    };

    if let Err(err) = result {
        // The queue's pending-entry recovery will redeliver; the ledger's
        // unique key keeps the replay idempotent.
        tracing::error!(correlation_id = %job.correlation_id, "queue signal failed: {}", err);
    }
}

/// Periodic queue maintenance: promote due retries and recover deliveries
/// from crashed consumers.
pub async fn run_maintenance(
    queue: JobQueue,
    consumer: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = maintenance_tick(&queue, &consumer).await {
                    tracing::error!("queue maintenance tick failed: {}", err);
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("queue maintenance stopping");
                return;
            }
        }
    }
}

async fn maintenance_tick(queue: &JobQueue, consumer: &str) -> anyhow::Result<()> {
    queue.promote_due(chrono::Utc::now()).await?;

    // Stalled deliveries go back on the stream as fresh entries, keeping
    // their attempt count.
    for delivery in queue.reclaim_stalled(consumer, 30_000).await? {
        match serde_json::from_str::<PaymentJob>(&delivery.raw) {
            Ok(job) => {
                queue.enqueue(&job).await?;
                queue.ack(&delivery.id).await?;
                tracing::warn!(correlation_id = %job.correlation_id, "stalled delivery requeued");
            }
            Err(err) => {
                queue.ack(&delivery.id).await?;
                tracing::warn!(delivery_id = %delivery.id, "stalled delivery dropped: {}", err);
            }
        }
    }
    Ok(())
}
