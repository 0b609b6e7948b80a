//! HTTP client for the GUI testing worker

use crate::config::WorkersSection;
use crate::envelope::{ChatEnvelope, ClientMessage};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, Instrument};

#[derive(Debug, Clone)]
pub struct GuiWorkerClient {
    client: Client,
    url: String,
}

impl GuiWorkerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("GUI worker client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(workers: &WorkersSection) -> GatewayResult<Self> {
        Self::new(
            workers.gui_url.clone(),
            Duration::from_secs(workers.gui_timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{"prompt": <envelope as a JSON string>}` and reshape the reply
    pub async fn run_tests(&self, message: &ClientMessage) -> GatewayResult<ChatEnvelope> {
        let span = crate::worker_span!(worker = "gui", url = %self.url);
        let result = async {
            let body = self.post(message.envelope_json()).await?;
            ChatEnvelope::from_gui_reply(&body)
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            metrics().gui_worker_failed();
            error!(url = %self.url, error = %e, "GUI worker call failed");
        }
        result
    }

    async fn post(&self, prompt: String) -> GatewayResult<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| {
                GatewayError::gui_worker(if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {e}")
                })
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::gui_worker(format!("failed to read body: {e}")))?;

        debug!(status = %status, body_len = text.len(), "GUI worker responded");

        if !status.is_success() {
            return Err(GatewayError::gui_worker(format!("status {status}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| GatewayError::gui_worker(format!("response is not JSON: {e}")))
    }
}
