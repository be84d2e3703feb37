//! WebSocket connection handler
//!
//! One handler per client connection. The session id comes from the
//! request path (`/ws/<session_id>`); results are streamed back through
//! an unbounded writer channel so a slow client delays delivery without
//! ever blocking the analysis engine.

use std::net::SocketAddr;
use std::sync::Arc;

use analysis_engine::{
    AnalysisError, AnalysisOrchestrator, AnalysisSession, ResultSink, SinkError,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use portfolio_service::{MetricResult, PortfolioService};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::messages::{AnalysisResultMessage, ClientRequest, ErrorMessage};

/// Streams metric results into the connection's writer channel
struct ChannelSink {
    tx: mpsc::UnboundedSender<WsMessage>,
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn deliver(&self, result: &MetricResult) -> Result<(), SinkError> {
        let text = serde_json::to_string(&AnalysisResultMessage::from(result))?;
        self.tx
            .send(WsMessage::Text(text))
            .map_err(|_| SinkError::from("client writer closed"))
    }
}

/// Extract the session id from a `/ws/<session_id>` request path
fn session_id_from_path(path: &str) -> Option<&str> {
    let session_id = path.strip_prefix("/ws/")?;
    if session_id.is_empty() || session_id.contains('/') {
        return None;
    }
    Some(session_id)
}

/// Handler for one WebSocket client connection
pub struct ConnectionHandler {
    peer_addr: SocketAddr,
    portfolio: Arc<PortfolioService>,
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl ConnectionHandler {
    pub fn new(
        peer_addr: SocketAddr,
        portfolio: Arc<PortfolioService>,
        orchestrator: Arc<AnalysisOrchestrator>,
    ) -> Self {
        Self { peer_addr, portfolio, orchestrator }
    }

    /// Drive the connection until the client disconnects
    pub async fn handle(&self, stream: TcpStream) -> GatewayResult<()> {
        let mut request_path = String::new();
        let ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| {
            request_path = req.uri().path().to_string();
            Ok(resp)
        })
        .await?;

        let session_id = session_id_from_path(&request_path)
            .ok_or_else(|| GatewayError::InvalidPath(request_path.clone()))?
            .to_string();
        info!("Client connected: session={} peer={}", session_id, self.peer_addr);

        // Make sure the session exists before accepting requests
        self.portfolio.ensure_session(&session_id).await?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_sender.send(message).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        let sink: Arc<dyn ResultSink> = Arc::new(ChannelSink { tx: tx.clone() });
        let mut analysis = AnalysisSession::new(
            session_id.clone(),
            Arc::clone(&self.portfolio),
            Arc::clone(&self.orchestrator),
        );

        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    self.handle_request(&text, &mut analysis, &sink, &tx).await;
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for session {}: {}", session_id, e);
                    break;
                }
            }
        }

        // Clean up any in-flight analysis before the connection dies
        analysis.shutdown().await;
        drop(tx);
        drop(sink);
        let _ = writer.await;

        info!("Client disconnected: session={}", session_id);
        Ok(())
    }

    async fn handle_request(
        &self,
        text: &str,
        analysis: &mut AnalysisSession,
        sink: &Arc<dyn ResultSink>,
        tx: &mpsc::UnboundedSender<WsMessage>,
    ) {
        let request: ClientRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                send_error(tx, format!("Invalid message: {e}"));
                return;
            }
        };

        if request.action != "analyze" {
            send_error(tx, format!("Unknown action: {}", request.action));
            return;
        }

        let symbol = request.symbol.to_uppercase();
        match analysis.analyze(&symbol, Arc::clone(sink)).await {
            Ok(()) => {}
            Err(AnalysisError::SessionNotFound(_)) => send_error(tx, "Session not found"),
            Err(e) => {
                error!("Failed to start analysis of {}: {}", symbol, e);
                send_error(tx, "Analysis could not be started");
            }
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<WsMessage>, detail: impl Into<String>) {
    match serde_json::to_string(&ErrorMessage::new(detail)) {
        Ok(text) => {
            let _ = tx.send(WsMessage::Text(text));
        }
        Err(e) => error!("Failed to serialize error message: {}", e),
    }
}
