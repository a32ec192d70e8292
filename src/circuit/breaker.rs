use crate::circuit::state::{self, BreakerSettings, BreakerState};
use crate::domain::payment::ProcessorKind;
use std::sync::Mutex;

/// One breaker per processor, shared by every worker. The two processors'
/// breakers never share a lock.
pub struct CircuitBreaker {
    kind: ProcessorKind,
    settings: BreakerSettings,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(kind: ProcessorKind, settings: BreakerSettings) -> Self {
        Self {
            kind,
            settings,
            inner: Mutex::new(BreakerState::default()),
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    /// True when the processor may be called. An elapsed cooldown resets the
    /// counter here, so exactly the next caller gets the half-open attempt.
    pub fn allows(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state::cooldown_elapsed(&state, &self.settings, now) {
            tracing::info!(processor = %self.kind, "breaker cooldown elapsed, closing");
            *state = BreakerState::default();
            return true;
        }
        !state::is_open(&state, &self.settings, now)
    }

    pub fn record_success(&self) {
        let mut state = self.inner.lock().unwrap();
        *state = state::record_success(state.clone());
    }

    pub fn record_failure(&self, now: chrono::DateTime<chrono::Utc>) {
        let mut state = self.inner.lock().unwrap();
        let next = state::record_failure(state.clone(), &self.settings, now);
        if state::is_open(&next, &self.settings, now) && state.opened_at.is_none() {
            tracing::warn!(
                processor = %self.kind,
                failures = next.consecutive_failures,
                "breaker opened"
            );
        }
        *state = next;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }
}
