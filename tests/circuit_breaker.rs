use payment_router::circuit::breaker::CircuitBreaker;
use payment_router::circuit::state::{
    is_open, record_failure, record_success, BreakerSettings, BreakerState,
};
use payment_router::domain::payment::ProcessorKind;

#[test]
fn stays_closed_below_threshold() {
    let settings = defaults();
    let now = chrono::Utc::now();
    let mut state = BreakerState::default();
    for _ in 0..4 {
        state = record_failure(state, &settings, now);
    }
    assert!(!is_open(&state, &settings, now));
    assert_eq!(state.consecutive_failures, 4);
    assert!(state.opened_at.is_none());
}

#[test]
fn opens_at_threshold() {
    let settings = defaults();
    let now = chrono::Utc::now();
    let mut state = BreakerState::default();
    for _ in 0..5 {
        state = record_failure(state, &settings, now);
    }
    assert!(is_open(&state, &settings, now));
    assert_eq!(state.opened_at, Some(now));
}

#[test]
fn success_decrements_and_clears_opened_at() {
    let settings = defaults();
    let now = chrono::Utc::now();
    let mut state = BreakerState::default();
    for _ in 0..5 {
        state = record_failure(state, &settings, now);
    }

    state = record_success(state);
    assert_eq!(state.consecutive_failures, 4);
    assert!(state.opened_at.is_none());
    assert!(!is_open(&state, &settings, now));
}

#[test]
fn success_never_goes_below_zero() {
    let state = record_success(BreakerState::default());
    assert_eq!(state.consecutive_failures, 0);
}

#[test]
fn closed_again_once_cooldown_elapses() {
    let settings = defaults();
    let opened = chrono::Utc::now();
    let mut state = BreakerState::default();
    for _ in 0..5 {
        state = record_failure(state, &settings, opened);
    }

    let during = opened + chrono::Duration::seconds(10);
    assert!(is_open(&state, &settings, during));

    let after = opened + chrono::Duration::seconds(31);
    assert!(!is_open(&state, &settings, after));
}

#[test]
fn shared_breaker_allows_retry_after_cooldown() {
    let breaker = CircuitBreaker::new(ProcessorKind::Default, defaults());
    let opened = chrono::Utc::now();
    for _ in 0..5 {
        breaker.record_failure(opened);
    }
    assert!(!breaker.allows(opened + chrono::Duration::seconds(5)));

    // Cooldown elapsed: the breaker resets and lets the next call through.
    let after = opened + chrono::Duration::seconds(31);
    assert!(breaker.allows(after));
    assert_eq!(breaker.consecutive_failures(), 0);

    // One failure on the retry does not immediately re-open.
    breaker.record_failure(after);
    assert!(breaker.allows(after));
}

fn defaults() -> BreakerSettings {
    BreakerSettings {
        threshold: 5,
        cooldown: chrono::Duration::seconds(30),
    }
}
