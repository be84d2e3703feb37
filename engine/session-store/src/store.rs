//! The session store contract shared by all backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Abstract session document store with atomic transaction support
///
/// Documents cross this boundary as raw JSON strings; the storage layer
/// stays agnostic of the session's structural shape. Every method
/// refreshes the key's TTL as a side effect. The three transaction
/// methods (`start_analysis`, `append_result`, `update_market`) each
/// commit all touched fields as one indivisible unit, serialized per
/// key by the backend, and return `None` when the session is absent
/// without creating it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session document only if absent (no-clobber) and
    /// return whatever is stored afterwards.
    ///
    /// A key left over under an incompatible representation is deleted
    /// and recreated; this recovery path is logged, never surfaced.
    async fn init(&self, session_id: &str, state_json: &str) -> Result<String>;

    /// Read the full document. Does not create.
    async fn read(&self, session_id: &str) -> Result<Option<String>>;

    /// Enumerate all live session ids under the namespace.
    ///
    /// Unbounded-cost scan; callers are expected to run it at low
    /// frequency (the market updater does, once per interval).
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Unconditionally overwrite `current_analysis` and `last_activity`,
    /// returning the full updated document.
    async fn start_analysis(
        &self,
        session_id: &str,
        marker_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// Append one result to the end of `analysis_results` in O(1)
    /// relative to document size and touch `last_activity`.
    async fn append_result(
        &self,
        session_id: &str,
        result_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// Recompute `total_value` from `holdings` and the supplied price
    /// map. Symbols missing a price contribute nothing.
    async fn update_market(
        &self,
        session_id: &str,
        prices_json: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;
}
