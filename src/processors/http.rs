use crate::domain::payment::ProcessorKind;
use crate::processors::{CallOutcome, HealthReading, ProcessorApi, ProcessorPaymentRequest};
use anyhow::Context;

pub struct HttpProcessor {
    pub kind: ProcessorKind,
    pub base_url: String,
    pub payment_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(
        kind: ProcessorKind,
        base_url: String,
        payment_timeout_ms: u64,
        health_timeout_ms: u64,
    ) -> Self {
        Self {
            kind,
            base_url,
            payment_timeout_ms,
            health_timeout_ms,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl ProcessorApi for HttpProcessor {
    fn kind(&self) -> ProcessorKind {
        self.kind
    }

    async fn send_payment(&self, request: &ProcessorPaymentRequest) -> CallOutcome {
        let url = format!("{}/payments", self.base_url);
        let resp = self
            .client
            .post(url)
            .json(request)
            .timeout(std::time::Duration::from_millis(self.payment_timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => CallOutcome::Accepted,
            Ok(r) => CallOutcome::Rejected(r.status().as_u16()),
            Err(e) if e.is_timeout() => CallOutcome::TimedOut,
            Err(_) => CallOutcome::Unreachable,
        }
    }

    async fn check_health(&self) -> anyhow::Result<HealthReading> {
        let url = format!("{}/payments/service-health", self.base_url);
        let resp = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_millis(self.health_timeout_ms))
            .send()
            .await
            .with_context(|| format!("health probe to {} processor failed", self.kind))?;

        if !resp.status().is_success() {
            anyhow::bail!(
                "health probe to {} processor returned {}",
                self.kind,
                resp.status()
            );
        }

        resp.json::<HealthReading>()
            .await
            .with_context(|| format!("malformed health body from {} processor", self.kind))
    }
}
