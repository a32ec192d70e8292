use crate::domain::health::StatusSnapshot;
use crate::domain::payment::ProcessorKind;

/// Pure processor selection. `None` means no processor is currently viable
/// and the job should be retried later.
///
/// Default is assumed cheaper, so it wins unless it is unusable or more than
/// 20% slower than fallback; the tolerance keeps noise-level latency
/// differences from flapping the choice.
pub fn select(
    snapshot: Option<&StatusSnapshot>,
    default_open: bool,
    fallback_open: bool,
) -> Option<ProcessorKind> {
    let snapshot = snapshot?;

    let default_usable = !snapshot.default.failing && !default_open;
    let fallback_usable = !snapshot.fallback.failing && !fallback_open;

    if default_usable
        && (!fallback_usable
            || snapshot.default.min_response_time_ms * 10
                <= snapshot.fallback.min_response_time_ms * 12)
    {
        return Some(ProcessorKind::Default);
    }
    if fallback_usable {
        return Some(ProcessorKind::Fallback);
    }
    None
}
