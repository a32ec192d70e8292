use crate::domain::health::StatusSnapshot;
use anyhow::Result;
use redis::AsyncCommands;

const SNAPSHOT_KEY: &str = "processors:status:v1";

/// Single-key snapshot store: whole-record replace, last writer wins.
#[derive(Clone)]
pub struct StatusStore {
    pub client: redis::Client,
}

impl StatusStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub async fn get_snapshot(&self) -> Result<Option<StatusSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(SNAPSHOT_KEY).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str::<StatusSnapshot>(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn save_snapshot(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(snapshot)?;
        let _: () = conn.set(SNAPSHOT_KEY, payload).await?;
        Ok(())
    }
}
