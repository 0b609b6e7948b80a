//! LLM provider implementations

pub mod openai;

pub use openai::*;

use crate::config::LlmSection;
use crate::llm::provider::{LlmError, LlmProvider};
use std::sync::Arc;

/// Build the provider named by `[llm]`.
///
/// Every supported provider speaks the OpenAI chat-completions dialect; the
/// name only selects the default base URL.
pub fn create_provider(
    llm: &LlmSection,
    api_key: String,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match llm.provider.as_str() {
        "openai" | "groq" => {}
        other if llm.base_url.is_some() => {
            tracing::info!(provider = %other, "Using custom OpenAI-compatible endpoint");
        }
        other => {
            return Err(LlmError::NotConfigured(format!(
                "Unsupported LLM provider '{other}' (set llm.base_url for OpenAI-compatible endpoints)"
            )))
        }
    }

    let provider = OpenAiProvider::new(OpenAiConfig {
        provider_name: llm.provider.clone(),
        api_key,
        base_url: llm.resolved_base_url(),
        ..Default::default()
    })?;
    Ok(Arc::new(provider))
}
