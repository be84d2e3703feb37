//! Message types for the gateway WebSocket API

use chrono::{DateTime, Utc};
use portfolio_service::MetricResult;
use serde::{Deserialize, Serialize};

/// Request sent by a client over the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Requested action; only "analyze" is supported
    pub action: String,

    /// Symbol to analyze
    pub symbol: String,
}

/// One streamed metric result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub symbol: String,
    pub metric: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&MetricResult> for AnalysisResultMessage {
    fn from(result: &MetricResult) -> Self {
        Self {
            message_type: "analysis_result".to_string(),
            symbol: result.symbol.clone(),
            metric: result.metric.clone(),
            value: result.value,
            timestamp: result.timestamp,
        }
    }
}

/// Error reported to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub detail: String,
}

impl ErrorMessage {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { message_type: "error".to_string(), detail: detail.into() }
    }
}
