//! Mock implementations for testing
//!
//! Scripted LLM provider, fixed classifier and a conversation store that
//! refuses to clear, so handlers can be exercised without network access.

use crate::agents::{ConversationStore, InMemoryConversationStore, SessionId};
use crate::error::{GatewayError, GatewayResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    TokenUsage,
};
use crate::routing::{TaskCategory, TaskClassifier};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// LLM provider that replays canned responses, repeating the last one
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
    current_response: Mutex<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn single_response(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Wait before answering, for cancellation tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock failure".to_string()));
        }

        let mut index = self.current_response.lock().await;
        let content = self
            .responses
            .get(*index)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| "Mock response".to_string());
        *index += 1;

        Ok(CompletionResponse {
            content: Some(content),
            model: request.model,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::NetworkError("Mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Classifier with a fixed answer
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    category: Option<TaskCategory>,
    delay: Option<Duration>,
    started: Arc<AtomicUsize>,
}

impl MockClassifier {
    pub fn always(category: TaskCategory) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Wait before answering, so a turn can be cancelled mid-classification
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `classify` calls that have begun
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskClassifier for MockClassifier {
    async fn classify(&self, _prompt: &str) -> Result<TaskCategory, LlmError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.category
            .ok_or_else(|| LlmError::NetworkError("Mock classifier failure".to_string()))
    }
}

/// Working store whose `clear` always fails
#[derive(Debug, Default)]
pub struct FailingConversationStore {
    inner: InMemoryConversationStore,
}

impl FailingConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for FailingConversationStore {
    async fn load(&self, session: SessionId) -> GatewayResult<Vec<Message>> {
        self.inner.load(session).await
    }

    async fn commit(&self, session: SessionId, messages: Vec<Message>) -> GatewayResult<()> {
        self.inner.commit(session, messages).await
    }

    async fn clear(&self, _session: SessionId) -> GatewayResult<()> {
        Err(GatewayError::session_state("mock store refuses to clear"))
    }
}
