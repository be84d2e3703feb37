//! Portfolio Analysis Service library
//!
//! Wiring for the production binary: configuration loading, logging
//! setup, signal handling, and component lifecycle.

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{load_configuration, LoggingConfig, ServiceConfig, StoreBackend};
pub use logging::initialize_logging;
pub use service::ServiceState;
pub use signals::{graceful_shutdown, setup_signal_handlers};
