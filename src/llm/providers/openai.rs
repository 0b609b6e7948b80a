//! OpenAI-compatible chat-completions provider
//!
//! Works against any endpoint that speaks the `/chat/completions` dialect:
//! OpenAI itself, Groq's OpenAI-compatible API, or a local proxy.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, ResponseFormat, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Label reported by [`LlmProvider::name`] ("openai", "groq", ...)
    pub provider_name: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            provider_name: "openai".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// OpenAI-compatible provider implementation
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(format!(
                "{} API key is required",
                config.provider_name
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn convert_message(message: &Message) -> WireMessage {
        WireMessage {
            role: match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: Some(message.content.clone()),
        }
    }

    fn convert_response_format(format: &ResponseFormat) -> WireResponseFormat {
        match format {
            ResponseFormat::Text => WireResponseFormat::Simple {
                format_type: "text".to_string(),
            },
            ResponseFormat::Json => WireResponseFormat::Simple {
                format_type: "json_object".to_string(),
            },
            ResponseFormat::JsonSchema { json_schema } => WireResponseFormat::JsonSchema {
                format_type: "json_schema".to_string(),
                json_schema: WireJsonSchema {
                    name: json_schema.name.clone(),
                    strict: json_schema.strict,
                    schema: json_schema.schema.clone(),
                },
            },
        }
    }

    fn build_wire_request(request: &CompletionRequest) -> WireCompletionRequest {
        WireCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request
                .response_format
                .as_ref()
                .map(Self::convert_response_format),
        }
    }

    fn parse_completion_response(
        response: WireCompletionResponse,
    ) -> Result<CompletionResponse, LlmError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from provider".to_string())
        })?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            usage,
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
        })
    }

    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    /// Network failures and 5xx responses are worth another attempt
    fn should_retry(error: &LlmError) -> bool {
        match error {
            LlmError::NetworkError(_) => true,
            LlmError::ApiError(msg) => msg.contains("server error"),
            _ => false,
        }
    }

    async fn complete_with_retry(
        &self,
        wire_request: WireCompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!(
                    provider = %self.config.provider_name,
                    attempt,
                    delay_ms,
                    "Retrying chat completion"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.send_once(&wire_request).await {
                Ok(wire_response) => {
                    let response = Self::parse_completion_response(wire_response)?;
                    debug!(
                        provider = %self.config.provider_name,
                        total_tokens = response.usage.total_tokens,
                        finish_reason = ?response.finish_reason,
                        "Chat completion succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        provider = %self.config.provider_name,
                        attempt = attempt + 1,
                        error = %e,
                        "Chat completion attempt failed"
                    );
                    if !Self::should_retry(&e) {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!(provider = %self.config.provider_name, "Chat completion failed after all retries");
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    async fn send_once(
        &self,
        wire_request: &WireCompletionRequest,
    ) -> Result<WireCompletionResponse, LlmError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(wire_request)
            .send()
            .await
            .map_err(|e| {
                LlmError::NetworkError(format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                ))
            })?;

        let status = response.status();

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!(
                "{} server error: {status} - {body}",
                self.config.provider_name
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::AuthenticationFailed(format!(
                "{} rejected the API key",
                self.config.provider_name
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!(
                "{} API error: {status} - {body}",
                self.config.provider_name
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let wire_request = Self::build_wire_request(&request);
        debug!(
            provider = %self.config.provider_name,
            model = %wire_request.model,
            messages = wire_request.messages.len(),
            "Sending chat completion"
        );
        self.complete_with_retry(wire_request).await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::AuthenticationFailed(format!(
                "{} health check returned {}",
                self.config.provider_name,
                response.status()
            )))
        }
    }
}

#[derive(Debug, Serialize)]
struct WireCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireResponseFormat {
    Simple {
        #[serde(rename = "type")]
        format_type: String,
    },
    JsonSchema {
        #[serde(rename = "type")]
        format_type: String,
        json_schema: WireJsonSchema,
    },
}

#[derive(Debug, Serialize)]
struct WireJsonSchema {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict: Option<bool>,
    schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::JsonSchemaDefinition;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            provider_name: "groq".to_string(),
            api_key: "test-key".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_creation_without_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_name_follows_config() {
        assert_eq!(provider().name(), "groq");
    }

    #[test]
    fn test_wire_request_omits_unset_fields() {
        let request = CompletionRequest::new("llama", vec![Message::user("Hello")]);
        let json = serde_json::to_value(OpenAiProvider::build_wire_request(&request)).unwrap();

        assert_eq!(json["model"], "llama");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_wire_request_json_schema_format() {
        let mut request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("x")]);
        request.temperature = Some(0.0);
        request.response_format = Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaDefinition {
                name: "task_category".to_string(),
                strict: Some(true),
                schema: serde_json::json!({"type": "object"}),
            },
        });

        let json = serde_json::to_value(OpenAiProvider::build_wire_request(&request)).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "task_category");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_finish_reason_conversion() {
        assert!(matches!(
            OpenAiProvider::convert_finish_reason(Some("stop")),
            FinishReason::Stop
        ));
        assert!(matches!(
            OpenAiProvider::convert_finish_reason(Some("length")),
            FinishReason::Length
        ));
        assert!(matches!(
            OpenAiProvider::convert_finish_reason(None),
            FinishReason::Error
        ));
    }

    #[test]
    fn test_parse_response_without_usage() {
        let wire: WireCompletionResponse = serde_json::from_value(serde_json::json!({
            "model": "llama",
            "choices": [{"message": {"role": "assistant", "content": "api"}, "finish_reason": "stop"}]
        }))
        .unwrap();

        let response = OpenAiProvider::parse_completion_response(wire).unwrap();
        assert_eq!(response.content.as_deref(), Some("api"));
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let wire: WireCompletionResponse =
            serde_json::from_value(serde_json::json!({"model": "llama", "choices": []})).unwrap();
        assert!(matches!(
            OpenAiProvider::parse_completion_response(wire),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_should_retry() {
        assert!(OpenAiProvider::should_retry(&LlmError::NetworkError(
            "reset".to_string()
        )));
        assert!(OpenAiProvider::should_retry(&LlmError::ApiError(
            "groq server error: 502".to_string()
        )));
        assert!(!OpenAiProvider::should_retry(&LlmError::ApiError(
            "groq API error: 400".to_string()
        )));
        assert!(!OpenAiProvider::should_retry(
            &LlmError::AuthenticationFailed("bad key".to_string())
        ));
    }
}
