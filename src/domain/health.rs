use crate::domain::payment::ProcessorKind;
use serde::{Deserialize, Serialize};

/// Latest known reading for one processor. `observed_at` is stamped by the
/// health monitor, not part of change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorHealth {
    pub failing: bool,
    pub min_response_time_ms: i64,
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

impl ProcessorHealth {
    pub fn unknown(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            failing: true,
            min_response_time_ms: 0,
            observed_at: now,
        }
    }

    pub fn same_reading(&self, failing: bool, min_response_time_ms: i64) -> bool {
        self.failing == failing && self.min_response_time_ms == min_response_time_ms
    }
}

/// The unit of publish/read: both processors' health, replaced atomically as
/// one record so readers never see a partial update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub default: ProcessorHealth,
    pub fallback: ProcessorHealth,
}

impl StatusSnapshot {
    pub fn unknown(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            default: ProcessorHealth::unknown(now),
            fallback: ProcessorHealth::unknown(now),
        }
    }

    pub fn get(&self, kind: ProcessorKind) -> &ProcessorHealth {
        match kind {
            ProcessorKind::Default => &self.default,
            ProcessorKind::Fallback => &self.fallback,
        }
    }

    pub fn get_mut(&mut self, kind: ProcessorKind) -> &mut ProcessorHealth {
        match kind {
            ProcessorKind::Default => &mut self.default,
            ProcessorKind::Fallback => &mut self.fallback,
        }
    }
}
