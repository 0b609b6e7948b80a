//! WebSocket client for the API testing worker
//!
//! Each API turn opens a fresh connection, sends the client's envelope and
//! relays the first text frame the worker answers with. Failures are turned
//! into human-readable strings that are relayed the same way.

use crate::config::WorkersSection;
use crate::observability::metrics;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, sleep_until, timeout, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, Instrument};

/// Failure outcomes; `Display` is the exact text relayed to the client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiWorkerError {
    #[error("Timeout Error: No response")]
    Timeout,

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<WsError> for ApiWorkerError {
    fn from(error: WsError) -> Self {
        match error {
            WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                ApiWorkerError::ConnectionClosed
            }
            WsError::Io(_) => ApiWorkerError::ConnectionClosed,
            other => ApiWorkerError::WebSocket(other.to_string()),
        }
    }
}

/// Connect failures: socket errors are `Unexpected`, handshake errors are `WebSocket`
fn connect_error(error: WsError) -> ApiWorkerError {
    match error {
        WsError::Io(e) => ApiWorkerError::Unexpected(e.to_string()),
        other => ApiWorkerError::WebSocket(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ApiWorkerClient {
    url: String,
    receive_timeout: Duration,
    ping_interval: Duration,
    ping_timeout: Duration,
}

impl ApiWorkerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            receive_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(20),
        }
    }

    pub fn from_config(workers: &WorkersSection) -> Self {
        Self::new(workers.api_url.clone())
            .with_receive_timeout(Duration::from_secs(workers.api_receive_timeout_secs))
            .with_keepalive(
                Duration::from_secs(workers.api_ping_interval_secs),
                Duration::from_secs(workers.api_ping_timeout_secs),
            )
    }

    pub fn with_receive_timeout(mut self, receive_timeout: Duration) -> Self {
        self.receive_timeout = receive_timeout;
        self
    }

    pub fn with_keepalive(mut self, ping_interval: Duration, ping_timeout: Duration) -> Self {
        self.ping_interval = ping_interval;
        self.ping_timeout = ping_timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `payload` and return the worker's answer, or the failure text
    pub async fn relay(&self, payload: String) -> String {
        self.call(payload)
            .await
            .unwrap_or_else(|e| e.to_string())
    }

    /// Like [`relay`](Self::relay) but keeps failures distinguishable
    pub async fn call(&self, payload: String) -> Result<String, ApiWorkerError> {
        let span = crate::worker_span!(worker = "api", url = %self.url);
        let result = self.exchange(payload).instrument(span).await;
        if let Err(e) = &result {
            metrics().api_worker_failed();
            error!(url = %self.url, error = %e, "API worker call failed");
        }
        result
    }

    pub async fn exchange(&self, payload: String) -> Result<String, ApiWorkerError> {
        let (socket, _) = timeout(self.receive_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ApiWorkerError::Unexpected("connection attempt timed out".to_string()))?
            .map_err(connect_error)?;
        debug!(url = %self.url, "API worker connected");

        let (mut sink, mut stream) = socket.split();
        sink.send(Message::Text(payload.into())).await?;

        let deadline = Instant::now() + self.receive_timeout;
        let mut ping_timer = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        let mut pong_deadline: Option<Instant> = None;

        loop {
            let pong_at = pong_deadline;
            tokio::select! {
                _ = sleep_until(deadline) => return Err(ApiWorkerError::Timeout),

                _ = async {
                    match pong_at {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    debug!(url = %self.url, "Keepalive pong overdue");
                    return Err(ApiWorkerError::ConnectionClosed);
                }

                _ = ping_timer.tick() => {
                    if pong_deadline.is_none() {
                        sink.send(Message::Ping(Vec::new().into())).await?;
                        pong_deadline = Some(Instant::now() + self.ping_timeout);
                    }
                }

                frame = stream.next() => match frame {
                    None | Some(Ok(Message::Close(_))) => {
                        return Err(ApiWorkerError::ConnectionClosed);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => {
                        let _ = sink.send(Message::Close(None)).await;
                        info!(url = %self.url, "API worker answered");
                        return Ok(text.to_string());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(String::from_utf8_lossy(&data).into_owned());
                    }
                    Some(Ok(Message::Pong(_))) => pong_deadline = None,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_outcomes() {
        assert_eq!(ApiWorkerError::Timeout.to_string(), "Timeout Error: No response");
        assert_eq!(
            ApiWorkerError::ConnectionClosed.to_string(),
            "Connection closed unexpectedly"
        );
        assert_eq!(
            ApiWorkerError::WebSocket("bad handshake".to_string()).to_string(),
            "WebSocket error: bad handshake"
        );
        assert_eq!(
            ApiWorkerError::Unexpected("boom".to_string()).to_string(),
            "Unexpected error: boom"
        );
    }

    #[test]
    fn test_closed_errors_map_to_connection_closed() {
        assert_eq!(
            ApiWorkerError::from(WsError::ConnectionClosed),
            ApiWorkerError::ConnectionClosed
        );
        assert_eq!(
            ApiWorkerError::from(WsError::Protocol(
                ProtocolError::ResetWithoutClosingHandshake
            )),
            ApiWorkerError::ConnectionClosed
        );
    }

    #[test]
    fn test_from_config() {
        let config = crate::config::GatewayConfig::test_config();
        let client = ApiWorkerClient::from_config(&config.workers);
        assert_eq!(client.url(), "ws://localhost:9002/ws");
        assert_eq!(client.receive_timeout, Duration::from_secs(60));
        assert_eq!(client.ping_interval, Duration::from_secs(30));
        assert_eq!(client.ping_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_io_error_after_connect_is_connection_closed() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert_eq!(
            ApiWorkerError::from(WsError::Io(reset)),
            ApiWorkerError::ConnectionClosed
        );
    }

    #[test]
    fn test_connect_io_error_is_unexpected() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            connect_error(WsError::Io(refused)),
            ApiWorkerError::Unexpected("refused".to_string())
        );
        assert!(matches!(
            connect_error(WsError::Url(
                tokio_tungstenite::tungstenite::error::UrlError::NoHostName
            )),
            ApiWorkerError::WebSocket(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_worker_is_unexpected_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ApiWorkerClient::new(format!("ws://127.0.0.1:{port}/ws"));
        let reply = client.relay("{}".to_string()).await;
        assert!(reply.starts_with("Unexpected error: "), "got {reply}");
    }
}
