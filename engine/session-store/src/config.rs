//! Configuration for the session store

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for session storage backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis connection URL
    pub url: String,

    /// Namespace prefix for session keys
    pub key_prefix: String,

    /// Idle time-to-live for session keys, refreshed on every read and write
    pub session_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "portfolio:".to_string(),
            session_ttl_secs: 86400, // 24 hours
        }
    }
}

impl StoreConfig {
    /// Session TTL as a `Duration`
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Full store key for a session id
    pub fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    /// Session id for a store key, if the key is under our namespace
    pub fn session_id<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.key_prefix)
    }
}
