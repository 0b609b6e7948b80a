//! LLM provider abstraction layer
//!
//! A provider-agnostic completion interface plus an OpenAI-compatible
//! chat-completions client (OpenAI, Groq and similar endpoints).

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
