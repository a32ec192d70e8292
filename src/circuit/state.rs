use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    pub threshold: u32,
    pub cooldown: chrono::Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerState {
    pub consecutive_failures: u32,
    pub opened_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn record_failure(
    mut state: BreakerState,
    settings: &BreakerSettings,
    now: chrono::DateTime<chrono::Utc>,
) -> BreakerState {
    state.consecutive_failures += 1;
    if state.consecutive_failures >= settings.threshold && state.opened_at.is_none() {
        state.opened_at = Some(now);
    }
    state
}

pub fn record_success(mut state: BreakerState) -> BreakerState {
    state.consecutive_failures = state.consecutive_failures.saturating_sub(1);
    state.opened_at = None;
    state
}

pub fn is_open(
    state: &BreakerState,
    settings: &BreakerSettings,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    state.consecutive_failures >= settings.threshold
        && state.opened_at.is_some_and(|t| now - t < settings.cooldown)
}

/// Once the cooldown elapses the breaker resets to closed, letting the next
/// call through; its outcome re-opens or keeps it closed.
pub fn cooldown_elapsed(
    state: &BreakerState,
    settings: &BreakerSettings,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    state.consecutive_failures >= settings.threshold
        && state.opened_at.is_some_and(|t| now - t >= settings.cooldown)
}
