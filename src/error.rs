//! Error types for the agentqa gateway
//!
//! Internal failures are rich `thiserror` enums. Anything that reaches a
//! WebSocket client goes through [`GatewayError::client_message`], which maps
//! the failure to a short, sanitized string.

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::db::DbError;
use crate::llm::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

/// Generic client-facing message for failures with no safer detail to show
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Client-facing message when the general responder produced no answer
pub const MISSING_ANSWER_MESSAGE: &str = "Messages not found in chat history.";

/// Client-facing message when session state could not be cleared
pub const RESET_FAILED_MESSAGE: &str = "Failed to reset chat history upon disconnection.";

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("General agent returned no answer")]
    MissingAnswer,

    #[error("GUI testing worker error: {message}")]
    GuiWorker { message: String },

    #[error("Session state error: {message}")]
    SessionState { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create GUI worker error
    pub fn gui_worker<S: Into<String>>(message: S) -> Self {
        Self::GuiWorker {
            message: message.into(),
        }
    }

    /// Create session state error
    pub fn session_state<S: Into<String>>(message: S) -> Self {
        Self::SessionState {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Message safe to send to a WebSocket client
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::MissingAnswer => MISSING_ANSWER_MESSAGE.to_string(),
            GatewayError::SessionState { .. } => RESET_FAILED_MESSAGE.to_string(),
            GatewayError::GuiWorker { message } => {
                sanitize_error_message(&format!("GUI testing worker error: {message}"))
            }
            _ => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }

    /// `{"error": ...}` payload for a WebSocket client
    pub fn to_client_json(&self) -> Value {
        json!({ "error": self.client_message() })
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static BEARER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("bearer pattern is valid"));

const MAX_CLIENT_MESSAGE_LEN: usize = 500;

/// Redact credentials and cap length before a message leaves the process
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();
    sanitized = BEARER_PATTERN
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    if sanitized.len() > MAX_CLIENT_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_CLIENT_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], suffix);
    }

    sanitized
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
