use payment_router::domain::health::{ProcessorHealth, StatusSnapshot};
use payment_router::domain::payment::ProcessorKind;
use payment_router::router::select;

#[test]
fn prefers_default_when_both_healthy() {
    let snapshot = snapshot(healthy(10), healthy(10));
    assert_eq!(select(Some(&snapshot), false, false), Some(ProcessorKind::Default));
}

#[test]
fn default_wins_within_latency_tolerance() {
    // 50 <= 45 * 1.2 = 54
    let snapshot = snapshot(healthy(50), healthy(45));
    assert_eq!(select(Some(&snapshot), false, false), Some(ProcessorKind::Default));
}

#[test]
fn fallback_wins_when_default_meaningfully_slower() {
    let snapshot = snapshot(healthy(100), healthy(45));
    assert_eq!(select(Some(&snapshot), false, false), Some(ProcessorKind::Fallback));
}

#[test]
fn open_breaker_excludes_default_despite_healthy_snapshot() {
    let snapshot = snapshot(healthy(10), healthy(10));
    assert_eq!(select(Some(&snapshot), true, false), Some(ProcessorKind::Fallback));
}

#[test]
fn failing_default_falls_back() {
    let snapshot = snapshot(failing(), healthy(10));
    assert_eq!(select(Some(&snapshot), false, false), Some(ProcessorKind::Fallback));
}

#[test]
fn default_chosen_when_fallback_unusable_even_if_slower() {
    let snapshot = snapshot(healthy(500), healthy(10));
    assert_eq!(select(Some(&snapshot), false, true), Some(ProcessorKind::Default));
}

#[test]
fn nothing_viable_when_both_failing() {
    let snapshot = snapshot(failing(), failing());
    assert_eq!(select(Some(&snapshot), false, false), None);
}

#[test]
fn nothing_viable_when_both_breakers_open() {
    let snapshot = snapshot(healthy(10), healthy(10));
    assert_eq!(select(Some(&snapshot), true, true), None);
}

#[test]
fn missing_snapshot_means_no_route() {
    assert_eq!(select(None, false, false), None);
}

#[test]
fn selection_is_deterministic() {
    let snapshot = snapshot(healthy(50), healthy(45));
    let first = select(Some(&snapshot), false, false);
    for _ in 0..10 {
        assert_eq!(select(Some(&snapshot), false, false), first);
    }
}

fn snapshot(default: ProcessorHealth, fallback: ProcessorHealth) -> StatusSnapshot {
    StatusSnapshot { default, fallback }
}

fn healthy(min_response_time_ms: i64) -> ProcessorHealth {
    ProcessorHealth {
        failing: false,
        min_response_time_ms,
        observed_at: chrono::Utc::now(),
    }
}

fn failing() -> ProcessorHealth {
    ProcessorHealth {
        failing: true,
        min_response_time_ms: 0,
        observed_at: chrono::Utc::now(),
    }
}
