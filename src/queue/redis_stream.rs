use crate::domain::payment::PaymentJob;
use anyhow::Result;
use redis::streams::{StreamAutoClaimOptions, StreamAutoClaimReply, StreamReadReply};
use redis::AsyncCommands;

const JOB_FIELD: &str = "job";

/// One job as handed to a worker. `id` is the stream entry id used to ack.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Requeued { delay_ms: u64 },
    AttemptsExhausted,
}

/// Durable job queue on a redis stream with a consumer group. Failed jobs go
/// through a delayed ZSET and are promoted back onto the stream once due;
/// stalled deliveries from dead consumers are reclaimed with XAUTOCLAIM.
#[derive(Clone)]
pub struct JobQueue {
    pub client: redis::Client,
    pub stream_key: String,
    pub group: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl JobQueue {
    const BACKOFF_CAP_MS: u64 = 30_000;

    fn delayed_key(&self) -> String {
        format!("{}:delayed", self.stream_key)
    }

    pub async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // BUSYGROUP on re-create is fine.
        let _: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        Ok(())
    }

    pub async fn enqueue(&self, job: &PaymentJob) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg(JOB_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Blocks up to `block_ms` for one job; `None` on an empty poll.
    pub async fn claim(&self, consumer: &str, block_ms: u64) -> Result<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // Nil means the block timed out with nothing to claim.
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let Some(reply) = reply else {
            return Ok(None);
        };

        for stream_key in reply.keys {
            for id in stream_key.ids {
                let raw = id
                    .map
                    .get(JOB_FIELD)
                    .and_then(|v| redis::from_redis_value::<String>(v).ok());
                if let Some(raw) = raw {
                    return Ok(Some(Delivery { id: id.id, raw }));
                }
                // Entry without a job field is unusable, drop it.
                self.ack(&id.id).await?;
            }
        }
        Ok(None)
    }

    pub async fn ack(&self, id: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg(id)
            .query_async(&mut conn)
            .await?;
        let _: i64 = conn.xdel(&self.stream_key, &[id]).await?;
        Ok(())
    }

    /// Parks the job (attempt incremented) on the delayed set, then acks the
    /// delivery. The ZADD must land before the ack: a crash between the two
    /// leaves the delivery pending, and the reclaimed duplicate is absorbed
    /// by the ledger's unique key. The reverse order would lose the job.
    pub async fn retry_later(
        &self,
        id: &str,
        job: &PaymentJob,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<RetryDisposition> {
        match retry_decision(job.attempt, self.max_attempts, self.backoff_base_ms, Self::BACKOFF_CAP_MS) {
            RetryDecision::Exhausted => {
                self.ack(id).await?;
                Ok(RetryDisposition::AttemptsExhausted)
            }
            RetryDecision::Requeue { attempt, delay_ms } => {
                let ready_at = now.timestamp_millis() + delay_ms as i64;
                let retried = PaymentJob {
                    attempt,
                    ..job.clone()
                };

                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let payload = serde_json::to_string(&retried)?;
                let _: i64 = conn.zadd(self.delayed_key(), payload, ready_at).await?;
                self.ack(id).await?;
                Ok(RetryDisposition::Requeued { delay_ms })
            }
        }
    }

    /// Moves due delayed jobs back onto the stream. Returns how many moved.
    pub async fn promote_due(&self, now: chrono::DateTime<chrono::Utc>) -> Result<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.delayed_key())
            .arg("-inf")
            .arg(now.timestamp_millis())
            .arg("LIMIT")
            .arg(0)
            .arg(100)
            .query_async(&mut conn)
            .await?;

        let mut moved = 0;
        for payload in due {
            let removed: i64 = conn.zrem(self.delayed_key(), &payload).await?;
            if removed == 0 {
                // Another promoter won the race for this entry.
                continue;
            }
            let _: String = redis::cmd("XADD")
                .arg(&self.stream_key)
                .arg("*")
                .arg(JOB_FIELD)
                .arg(&payload)
                .query_async(&mut conn)
                .await?;
            moved += 1;
        }
        Ok(moved)
    }

    /// Takes over deliveries a crashed consumer never acked.
    pub async fn reclaim_stalled(&self, consumer: &str, min_idle_ms: u64) -> Result<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: StreamAutoClaimReply = conn
            .xautoclaim_options(
                &self.stream_key,
                &self.group,
                consumer,
                min_idle_ms as usize,
                "0-0",
                StreamAutoClaimOptions::default().count(10),
            )
            .await?;

        let mut deliveries = Vec::new();
        for id in reply.claimed {
            let raw = id
                .map
                .get(JOB_FIELD)
                .and_then(|v| redis::from_redis_value::<String>(v).ok());
            if let Some(raw) = raw {
                deliveries.push(Delivery { id: id.id, raw });
            }
        }
        Ok(deliveries)
    }
}

/// What the next delivery of a failed job should be. `attempt` counts
/// deliveries already made, so a job gets `max_attempts` deliveries in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Requeue { attempt: u32, delay_ms: u64 },
    Exhausted,
}

pub fn retry_decision(attempt: u32, max_attempts: u32, base_ms: u64, cap_ms: u64) -> RetryDecision {
    let next_attempt = attempt + 1;
    if next_attempt >= max_attempts {
        return RetryDecision::Exhausted;
    }
    RetryDecision::Requeue {
        attempt: next_attempt,
        delay_ms: backoff_ms(base_ms, next_attempt, cap_ms),
    }
}

pub fn backoff_ms(base_ms: u64, attempt: u32, cap_ms: u64) -> u64 {
    let exp = attempt.min(16);
    base_ms.saturating_mul(1u64 << exp).min(cap_ms)
}
