//! In-memory session store
//!
//! Backs unit tests and Redis-less local runs. Each method holds the
//! map lock for the whole mutation, which gives the same per-key
//! all-or-nothing semantics the Lua scripts give on Redis. TTL is
//! honored with per-entry expiry instants, refreshed on every access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::store::SessionStore;

struct Entry {
    doc: Value,
    expires_at: Instant,
}

/// Session store backed by a process-local map
pub struct MemorySessionStore {
    session_ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self { session_ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Insert a raw value under a session id, bypassing the document
    /// contract. Lets tests and seed tooling plant stale or malformed
    /// entries.
    pub fn seed_raw(&self, session_id: &str, value: Value) {
        let mut entries = self.lock();
        entries.insert(
            session_id.to_string(),
            Entry { doc: value, expires_at: Instant::now() + self.session_ttl },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // Lock poisoning only happens after a panic mid-mutation; at
        // that point the process is going down anyway.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh_expiry(&self) -> Instant {
        Instant::now() + self.session_ttl
    }
}

fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    session_id: &str,
    expiry: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(session_id).is_some_and(|e| e.expires_at <= Instant::now()) {
        entries.remove(session_id);
        return None;
    }
    let entry = entries.get_mut(session_id)?;
    entry.expires_at = expiry;
    Some(entry)
}

fn require_document(entry: &Entry, session_id: &str) -> Result<()> {
    if entry.doc.is_object() {
        Ok(())
    } else {
        Err(StoreError::corrupt(format!("session {session_id} is not a JSON document")))
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn init(&self, session_id: &str, state_json: &str) -> Result<String> {
        let expiry = self.fresh_expiry();
        let mut entries = self.lock();

        match live(&mut entries, session_id, expiry) {
            Some(entry) if entry.doc.is_object() => Ok(entry.doc.to_string()),
            existing => {
                if existing.is_some() {
                    warn!("Replacing stale session entry {}", session_id);
                }
                let doc: Value = serde_json::from_str(state_json)?;
                let rendered = doc.to_string();
                entries.insert(session_id.to_string(), Entry { doc, expires_at: expiry });
                Ok(rendered)
            }
        }
    }

    async fn read(&self, session_id: &str) -> Result<Option<String>> {
        let expiry = self.fresh_expiry();
        let mut entries = self.lock();
        Ok(live(&mut entries, session_id, expiry).map(|e| e.doc.to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, e| e.expires_at > now);
        Ok(entries.keys().cloned().collect())
    }

    async fn start_analysis(
        &self,
        session_id: &str,
        marker_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let marker: Value = serde_json::from_str(marker_json)?;
        let now_value = serde_json::to_value(now)?;

        let expiry = self.fresh_expiry();
        let mut entries = self.lock();
        let Some(entry) = live(&mut entries, session_id, expiry) else {
            return Ok(None);
        };
        require_document(entry, session_id)?;

        entry.doc["current_analysis"] = marker;
        entry.doc["last_activity"] = now_value;
        Ok(Some(entry.doc.to_string()))
    }

    async fn append_result(
        &self,
        session_id: &str,
        result_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let result: Value = serde_json::from_str(result_json)?;
        let now_value = serde_json::to_value(now)?;

        let expiry = self.fresh_expiry();
        let mut entries = self.lock();
        let Some(entry) = live(&mut entries, session_id, expiry) else {
            return Ok(None);
        };
        require_document(entry, session_id)?;

        entry.doc["analysis_results"]
            .as_array_mut()
            .ok_or_else(|| {
                StoreError::corrupt(format!("session {session_id} has no analysis_results array"))
            })?
            .push(result);
        entry.doc["last_activity"] = now_value;
        Ok(Some(entry.doc.to_string()))
    }

    async fn update_market(
        &self,
        session_id: &str,
        prices_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let prices: HashMap<String, f64> = serde_json::from_str(prices_json)?;
        let now_value = serde_json::to_value(now)?;

        let expiry = self.fresh_expiry();
        let mut entries = self.lock();
        let Some(entry) = live(&mut entries, session_id, expiry) else {
            return Ok(None);
        };
        require_document(entry, session_id)?;

        let holdings = entry.doc["holdings"].as_object().ok_or_else(|| {
            StoreError::corrupt(format!("session {session_id} has no holdings object"))
        })?;

        let mut total = 0.0;
        for (symbol, qty) in holdings {
            if let (Some(price), Some(qty)) = (prices.get(symbol), qty.as_f64()) {
                total += price * qty;
            }
        }

        entry.doc["total_value"] = serde_json::to_value(total)?;
        entry.doc["last_activity"] = now_value;
        Ok(Some(entry.doc.to_string()))
    }
}
