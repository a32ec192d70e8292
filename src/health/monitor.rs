use crate::domain::health::StatusSnapshot;
use crate::domain::payment::ProcessorKind;
use crate::health::store_redis::StatusStore;
use crate::processors::{HealthReading, ProcessorApi};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Probes both processors on a fixed cadence and publishes the merged
/// snapshot. One bad tick never wedges the next.
pub struct HealthMonitor {
    pub store: StatusStore,
    pub default_processor: Arc<dyn ProcessorApi>,
    pub fallback_processor: Arc<dyn ProcessorApi>,
    pub poll_interval: std::time::Duration,
}

impl HealthMonitor {
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut current = StatusSnapshot::unknown(chrono::Utc::now());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick(&mut current).await {
                        tracing::error!("health monitor tick failed: {}", err);
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("health monitor stopping");
                    return;
                }
            }
        }
    }

    async fn tick(&self, current: &mut StatusSnapshot) -> Result<()> {
        // Independent timeouts live inside each probe; neither can delay the
        // other.
        let (default_reading, fallback_reading) = tokio::join!(
            self.default_processor.check_health(),
            self.fallback_processor.check_health(),
        );

        let now = chrono::Utc::now();
        let mut changed = false;
        changed |= merge_reading(current, ProcessorKind::Default, default_reading, now);
        changed |= merge_reading(current, ProcessorKind::Fallback, fallback_reading, now);

        if changed {
            self.store.save_snapshot(current).await?;
            tracing::info!(
                default_failing = current.default.failing,
                fallback_failing = current.fallback.failing,
                "processor status updated"
            );
        }

        Ok(())
    }
}

/// Applies one probe result to the in-memory snapshot. Returns true when the
/// stored entry actually changed.
pub fn merge_reading(
    snapshot: &mut StatusSnapshot,
    kind: ProcessorKind,
    reading: Result<HealthReading>,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    let entry = snapshot.get_mut(kind);
    match reading {
        Ok(reading) => {
            if entry.same_reading(reading.failing, reading.min_response_time) {
                return false;
            }
            entry.failing = reading.failing;
            entry.min_response_time_ms = reading.min_response_time;
            entry.observed_at = now;
            true
        }
        Err(err) => {
            tracing::warn!(processor = %kind, "unable to verify processor status: {}", err);
            if entry.failing {
                return false;
            }
            entry.failing = true;
            entry.observed_at = now;
            true
        }
    }
}
