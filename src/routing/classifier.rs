//! LLM-backed task classification
//!
//! One completion per prompt asks the model to name the handler. Replies are
//! parsed leniently and anything unusable resolves to
//! [`TaskCategory::General`].

use crate::llm::provider::{
    CompletionRequest, JsonSchemaDefinition, LlmError, LlmProvider, Message, ResponseFormat,
};
use crate::observability::metrics;
use crate::routing::category::{parse_label, TaskCategory};
use crate::routing::schema::ClassificationOutput;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decides which handler serves a prompt
#[async_trait]
pub trait TaskClassifier: Send + Sync {
    /// `Err` only when the model could not be reached; unusable replies
    /// resolve to `General`.
    async fn classify(&self, prompt: &str) -> Result<TaskCategory, LlmError>;
}

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are a task router for a QA assistant. \
Decide which agent is best suited to handle the task.";

pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    structured_output: bool,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            structured_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request `{"category": ...}` through a JSON schema response format
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    pub fn build_classification_prompt(task: &str) -> String {
        format!(
            r#"Analyze the following task and decide which agent should handle it.

TASK:
{task}

AGENTS:
- GeneralAgent: handles general tasks, questions and conversation that need no testing tools.
- GUITestingAgent: handles UI testing tasks such as validating user interfaces, forms, pages and visual behaviour in a browser.
- APITestingAgent: handles API testing tasks such as generating tests from a Swagger/OpenAPI document, running collections with the Newman CLI, and producing CSV test data.

Return only one of: api, gui, or general."#
        )
    }

    fn build_completion_request(&self, task: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(
            self.model.clone(),
            vec![
                Message::system(CLASSIFIER_SYSTEM_PROMPT),
                Message::user(Self::build_classification_prompt(task)),
            ],
        );
        request.temperature = Some(self.temperature);
        request.max_tokens = self.max_tokens;

        if self.structured_output {
            request.response_format = Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaDefinition {
                    name: ClassificationOutput::SCHEMA_NAME.to_string(),
                    strict: Some(true),
                    schema: ClassificationOutput::json_schema(),
                },
            });
        }

        request
    }

    /// Structured reply first, then free-text label parsing
    pub fn interpret_reply(reply: &str) -> Option<TaskCategory> {
        if let Ok(output) = serde_json::from_str::<ClassificationOutput>(reply.trim()) {
            return Some(output.category);
        }
        parse_label(reply)
    }
}

#[async_trait]
impl TaskClassifier for LlmClassifier {
    async fn classify(&self, prompt: &str) -> Result<TaskCategory, LlmError> {
        let request = self.build_completion_request(prompt);
        let response = self.provider.complete(request).await?;
        let reply = response.content.unwrap_or_default();

        debug!(provider = %self.provider.name(), reply = %reply, "Classifier reply");

        match Self::interpret_reply(&reply) {
            Some(category) => {
                info!(category = %category, "Task classified");
                Ok(category)
            }
            None => {
                metrics().classifier_fallback();
                warn!(reply = %reply, "Unrecognized classifier reply, falling back to general");
                Ok(TaskCategory::General)
            }
        }
    }
}
