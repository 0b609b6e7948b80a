//! The general-purpose responder
//!
//! Answers prompts with a plain LLM completion, keeping the running
//! conversation of each session so follow-ups have context.

use crate::agents::conversation::{ConversationStore, SessionId};
use crate::error::{GatewayError, GatewayResult};
use crate::llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use tracing::{debug, info};

/// Name stamped on general replies
pub const GENERAL_AGENT_NAME: &str = "GeneralAgent";

pub struct GeneralAgent {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ConversationStore>,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl GeneralAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ConversationStore>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.0,
            max_tokens: None,
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

    /// Answer `prompt` in the context of `session`.
    ///
    /// The user and assistant messages are committed together only after a
    /// non-empty answer arrives, so a cancelled or failed turn leaves the
    /// history untouched.
    pub async fn answer(&self, session: SessionId, prompt: &str) -> GatewayResult<String> {
        let history = self.store.load(session).await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(history);
        messages.push(Message::user(prompt));

        debug!(session = %session, messages = messages.len(), "General agent request");

        let mut request = CompletionRequest::new(self.model.clone(), messages);
        request.temperature = Some(self.temperature);
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;
        let answer = response
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or(GatewayError::MissingAnswer)?;

        self.store
            .commit(
                session,
                vec![Message::user(prompt), Message::assistant(answer.clone())],
            )
            .await?;

        info!(session = %session, answer_len = answer.len(), "General agent answered");
        Ok(answer)
    }

    /// Drop the session's conversation
    pub async fn reset(&self, session: SessionId) -> GatewayResult<()> {
        self.store.clear(session).await
    }
}
