//! PortfolioGateway - WebSocket API for live portfolio analysis
//!
//! Thin transport layer: accepts client connections at
//! `/ws/<session_id>`, relays analyze requests into the analysis
//! engine, and streams metric results back as they complete. All state
//! consistency lives below this crate.

mod config;
mod connection;
mod error;
mod messages;
mod server;

pub use config::GatewayConfig;
pub use connection::ConnectionHandler;
pub use error::{GatewayError, GatewayResult};
pub use messages::{AnalysisResultMessage, ClientRequest, ErrorMessage};
pub use server::GatewayServer;
