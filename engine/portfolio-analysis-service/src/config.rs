//! Service configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use analysis_engine::AnalysisConfig;
use market_updater::MarketConfig;
use portfolio_gateway::GatewayConfig;
use portfolio_service::SessionDefaults;
use session_store::StoreConfig;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Session store configuration
    pub store: StoreSettings,

    /// Starting state for new sessions
    pub session_defaults: SessionDefaults,

    /// Analysis engine configuration
    pub analysis: AnalysisConfig,

    /// Market updater configuration
    pub market: MarketConfig,

    /// WebSocket gateway configuration
    pub gateway: GatewayConfig,

    /// Service-level settings
    pub service: ServiceSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which session store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis with RedisJSON and Lua transaction scripts
    Redis,
    /// Process-local store for development and tests
    Memory,
}

/// Store backend selection plus connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    #[serde(flatten)]
    pub store: StoreConfig,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::Redis, store: StoreConfig::default() }
    }
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { shutdown_timeout_secs: 10 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment variable overrides for deployment settings
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.store.store.url = url;
        }
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "redis" => self.store.backend = StoreBackend::Redis,
                other => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", other),
            }
        }
        if let Ok(port) = std::env::var("GATEWAY_PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring non-numeric GATEWAY_PORT '{}'", port),
            }
        }
    }
}

/// Load configuration from `CONFIG_PATH` (default `config.toml`),
/// falling back to defaults when no file exists, then apply env
/// overrides.
pub fn load_configuration() -> Result<ServiceConfig> {
    // Load .env for local development; ignore if missing
    let _ = dotenv::dotenv();

    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = if Path::new(&path).exists() {
        ServiceConfig::from_file(&path)?
    } else {
        ServiceConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}
