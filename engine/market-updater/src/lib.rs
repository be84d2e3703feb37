//! MarketUpdater - periodic reprice loop for all active sessions
//!
//! Once per interval the updater enumerates live sessions, synthesizes
//! a price for every held symbol (a bounded random walk around a
//! per-symbol base price), and applies it through the atomic reprice
//! transaction. Per-session failures never stop the loop.

mod config;
mod updater;

pub use config::MarketConfig;
pub use updater::MarketUpdater;

#[cfg(test)]
mod tests;
