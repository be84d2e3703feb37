//! SessionStore - atomic session document storage for portfolio analysis
//!
//! This crate owns the store boundary: key naming, TTL refresh, and the
//! three atomic transaction scripts (start-analysis, append-result,
//! reprice). Two backends implement the same contract: a Redis backend
//! using server-side Lua scripts, and an in-memory backend used by tests
//! and Redis-less local runs.

mod config;
mod error;
mod memory;
mod redis_store;
mod scripts;
mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use store::SessionStore;
