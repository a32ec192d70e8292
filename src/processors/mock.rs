use crate::domain::payment::ProcessorKind;
use crate::processors::{CallOutcome, HealthReading, ProcessorApi, ProcessorPaymentRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted processor for tests: pops one outcome per call, repeats the last
/// one once the script is exhausted.
pub struct MockProcessor {
    pub kind: ProcessorKind,
    script: Mutex<Vec<CallOutcome>>,
    pub calls: AtomicUsize,
    pub health: Mutex<anyhow::Result<HealthReading>>,
}

impl MockProcessor {
    pub fn new(kind: ProcessorKind, script: Vec<CallOutcome>) -> Self {
        Self {
            kind,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            health: Mutex::new(Ok(HealthReading {
                failing: false,
                min_response_time: 0,
            })),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProcessorApi for MockProcessor {
    fn kind(&self) -> ProcessorKind {
        self.kind
    }

    async fn send_payment(&self, _request: &ProcessorPaymentRequest) -> CallOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script.first().cloned().unwrap_or(CallOutcome::Unreachable)
        }
    }

    async fn check_health(&self) -> anyhow::Result<HealthReading> {
        let guard = self.health.lock().unwrap();
        match &*guard {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }
}
