//! Client-facing message shapes
//!
//! Parsing of the inbound `{"prompt": ...}` envelope and the outbound reply
//! forms: the chat envelope shared by the general and GUI handlers, and the
//! raw text relayed from the API worker.

use crate::agents::GENERAL_AGENT_NAME;
use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plain-text reply for input without a usable `prompt`
pub const INVALID_STRUCTURE_MESSAGE: &str =
    "Invalid message structure. Ensure the JSON contains 'prompt'.";

/// Artifact name attached to every general reply
pub const GENERAL_DOWNLOAD_URL: &str = "newman-report.html";

/// One inbound turn: the raw JSON object plus its prompt text
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub envelope: Map<String, Value>,
    pub prompt: String,
}

impl ClientMessage {
    /// `None` for non-JSON text, non-object JSON, or a missing `prompt`.
    /// Non-string prompts are used as their JSON text.
    pub fn parse(text: &str) -> Option<Self> {
        let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(text) else {
            return None;
        };
        let prompt = match envelope.get("prompt")? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(Self { envelope, prompt })
    }

    /// The envelope as it is forwarded to workers
    pub fn envelope_json(&self) -> String {
        Value::Object(self.envelope.clone()).to_string()
    }
}

/// One entry of a general reply's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub content: String,
    pub role: String,
    pub name: String,
}

/// Reply shape shared by the general and GUI handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub chat_id: Option<Value>,
    pub chat_history: Vec<Value>,
    pub download_url: Option<Value>,
}

impl ChatEnvelope {
    pub fn general(prompt: &str, answer: &str) -> Self {
        let turns = [("user", prompt), ("assistant", answer)].map(|(role, content)| ChatTurn {
            content: content.to_string(),
            role: role.to_string(),
            name: GENERAL_AGENT_NAME.to_string(),
        });

        Self {
            chat_id: None,
            chat_history: turns
                .iter()
                .filter_map(|turn| serde_json::to_value(turn).ok())
                .collect(),
            download_url: Some(Value::String(GENERAL_DOWNLOAD_URL.to_string())),
        }
    }

    /// Reshape a GUI worker body `{"messages", "thread_id", "download_url"}`.
    ///
    /// History is cut after the latest assistant message; a body with no
    /// assistant message is an error.
    pub fn from_gui_reply(body: &Value) -> GatewayResult<Self> {
        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let latest_assistant = messages
            .iter()
            .rposition(|message| message.get("role").and_then(Value::as_str) == Some("assistant"))
            .ok_or_else(|| GatewayError::gui_worker("reply contains no assistant message"))?;

        Ok(Self {
            chat_id: non_null(body.get("thread_id")),
            chat_history: messages[..=latest_assistant].to_vec(),
            download_url: non_null(body.get("download_url")),
        })
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// What goes back to the client for one turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnReply {
    /// Serialized as a JSON text frame
    Json(Value),
    /// Sent verbatim as a text frame
    Text(String),
}

impl TurnReply {
    pub fn envelope(envelope: &ChatEnvelope) -> Self {
        match serde_json::to_value(envelope) {
            Ok(value) => TurnReply::Json(value),
            Err(e) => TurnReply::error(&GatewayError::internal(e.to_string())),
        }
    }

    pub fn error(error: &GatewayError) -> Self {
        TurnReply::Json(error.to_client_json())
    }

    pub fn invalid_structure() -> Self {
        TurnReply::Text(INVALID_STRUCTURE_MESSAGE.to_string())
    }

    pub fn into_text(self) -> String {
        match self {
            TurnReply::Json(value) => value.to_string(),
            TurnReply::Text(text) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_prompt() {
        let message = ClientMessage::parse(r#"{"prompt": "test the login", "user": 7}"#).unwrap();
        assert_eq!(message.prompt, "test the login");
        assert_eq!(message.envelope["user"], 7);
    }

    #[test]
    fn test_parse_non_string_prompt() {
        let message = ClientMessage::parse(r#"{"prompt": {"steps": [1, 2]}}"#).unwrap();
        assert_eq!(message.prompt, r#"{"steps":[1,2]}"#);
    }

    #[test]
    fn test_parse_rejects_bad_structure() {
        for text in [
            r#"{"task": "x"}"#,
            "not json",
            r#"["prompt"]"#,
            r#""prompt""#,
            "",
        ] {
            assert!(ClientMessage::parse(text).is_none(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_envelope_json_keeps_extra_fields() {
        let message = ClientMessage::parse(r#"{"prompt": "p", "swagger": "url"}"#).unwrap();
        let forwarded: Value = serde_json::from_str(&message.envelope_json()).unwrap();
        assert_eq!(forwarded, json!({"prompt": "p", "swagger": "url"}));
    }

    #[test]
    fn test_general_envelope_shape() {
        let value = serde_json::to_value(ChatEnvelope::general("hi", "hello")).unwrap();
        assert_eq!(
            value,
            json!({
                "chat_id": null,
                "chat_history": [
                    {"content": "hi", "role": "user", "name": "GeneralAgent"},
                    {"content": "hello", "role": "assistant", "name": "GeneralAgent"}
                ],
                "download_url": "newman-report.html"
            })
        );
    }

    #[test]
    fn test_gui_reply_truncates_after_latest_assistant() {
        let body = json!({
            "thread_id": "t-42",
            "download_url": "https://artifacts/report.zip",
            "messages": [
                {"role": "user", "content": "check login"},
                {"role": "assistant", "content": "step 1"},
                {"role": "tool", "content": "screenshot"},
                {"role": "assistant", "content": "done"},
                {"role": "tool", "content": "trailing"}
            ]
        });

        let envelope = ChatEnvelope::from_gui_reply(&body).unwrap();
        assert_eq!(envelope.chat_id, Some(json!("t-42")));
        assert_eq!(envelope.download_url, Some(json!("https://artifacts/report.zip")));
        assert_eq!(envelope.chat_history.len(), 4);
        assert_eq!(envelope.chat_history[3]["content"], "done");
    }

    #[test]
    fn test_gui_reply_without_optional_fields() {
        let body = json!({"messages": [{"role": "assistant", "content": "ok"}]});
        let value = serde_json::to_value(ChatEnvelope::from_gui_reply(&body).unwrap()).unwrap();
        assert_eq!(value["chat_id"], Value::Null);
        assert_eq!(value["download_url"], Value::Null);
        assert_eq!(value["chat_history"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_gui_reply_without_assistant_is_error() {
        for body in [
            json!({"messages": [{"role": "user", "content": "x"}]}),
            json!({"messages": []}),
            json!({"detail": "boom"}),
            json!("just a string"),
        ] {
            assert!(matches!(
                ChatEnvelope::from_gui_reply(&body),
                Err(GatewayError::GuiWorker { .. })
            ));
        }
    }

    #[test]
    fn test_turn_reply_text() {
        assert_eq!(
            TurnReply::invalid_structure().into_text(),
            INVALID_STRUCTURE_MESSAGE
        );
        assert_eq!(
            TurnReply::Text("Timeout Error: No response".to_string()).into_text(),
            "Timeout Error: No response"
        );
        assert_eq!(
            TurnReply::error(&GatewayError::MissingAnswer).into_text(),
            r#"{"error":"Messages not found in chat history."}"#
        );
    }
}
