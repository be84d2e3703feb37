//! Redis-backed session store
//!
//! One RedisJSON document per session under `portfolio:<session_id>`.
//! Multi-step mutations go through the Lua scripts in [`crate::scripts`]
//! so Redis serializes them per key; simple reads and the no-clobber
//! create use plain commands.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::scripts;
use crate::store::SessionStore;

/// Session store backed by Redis with RedisJSON
pub struct RedisSessionStore {
    connection_manager: ConnectionManager,
    config: StoreConfig,
    start_analysis: Script,
    append_result: Script,
    update_market: Script,
}

impl RedisSessionStore {
    /// Connect to Redis and prepare the transaction scripts
    pub async fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection_manager = ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
            start_analysis: Script::new(scripts::START_ANALYSIS),
            append_result: Script::new(scripts::APPEND_RESULT),
            update_market: Script::new(scripts::UPDATE_MARKET),
        })
    }

    /// Verify the Redis connection is alive
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn ttl_secs(&self) -> usize {
        self.config.session_ttl_secs as usize
    }

    async fn run_script(
        &self,
        script: &Script,
        session_id: &str,
        payload_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let now_json = serde_json::to_string(&now)?;
        let raw: Option<String> = script
            .key(self.config.key(session_id))
            .arg(payload_json)
            .arg(now_json)
            .arg(self.ttl_secs())
            .invoke_async(&mut conn)
            .await?;
        Ok(raw)
    }
}

/// A key under our namespace holding something other than a JSON
/// document, left behind by a previous incompatible run.
fn is_stale_representation(err: &redis::RedisError) -> bool {
    err.code() == Some("WRONGTYPE") || err.to_string().contains("wrong Redis type")
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn init(&self, session_id: &str, state_json: &str) -> Result<String> {
        let key = self.config.key(session_id);
        let mut conn = self.connection_manager.clone();

        // NX: only set if the key does not already exist
        let created: std::result::Result<Option<String>, redis::RedisError> =
            redis::cmd("JSON.SET")
                .arg(&key)
                .arg("$")
                .arg(state_json)
                .arg("NX")
                .query_async(&mut conn)
                .await;

        match created {
            Ok(_) => {}
            Err(e) if is_stale_representation(&e) => {
                warn!("Replacing stale session key {} ({})", key, e);
                let _: () = conn.del(&key).await?;
                let _: () = redis::cmd("JSON.SET")
                    .arg(&key)
                    .arg("$")
                    .arg(state_json)
                    .query_async(&mut conn)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        let _: () = conn.expire(&key, self.ttl_secs() as i64).await?;

        let raw: Option<String> =
            redis::cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        raw.ok_or_else(|| {
            crate::error::StoreError::corrupt(format!("session {session_id} vanished during init"))
        })
    }

    async fn read(&self, session_id: &str) -> Result<Option<String>> {
        let key = self.config.key(session_id);
        let mut conn = self.connection_manager.clone();

        let raw: Option<String> =
            redis::cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        if raw.is_some() {
            let _: () = conn.expire(&key, self.ttl_secs() as i64).await?;
        }
        Ok(raw)
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let pattern = format!("{}*", self.config.key_prefix);

        let mut session_ids = Vec::new();
        let mut iter: redis::AsyncIter<'_, String> = conn.scan_match(&pattern).await?;
        while let Some(key) = iter.next_item().await {
            if let Some(session_id) = self.config.session_id(&key) {
                session_ids.push(session_id.to_string());
            }
        }
        debug!("Scanned {} live sessions", session_ids.len());
        Ok(session_ids)
    }

    async fn start_analysis(
        &self,
        session_id: &str,
        marker_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.run_script(&self.start_analysis, session_id, marker_json, now).await
    }

    async fn append_result(
        &self,
        session_id: &str,
        result_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.run_script(&self.append_result, session_id, result_json, now).await
    }

    async fn update_market(
        &self,
        session_id: &str,
        prices_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.run_script(&self.update_market, session_id, prices_json, now).await
    }
}
