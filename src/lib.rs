//! agentqa: an LLM-classified task router for QA requests
//!
//! Clients connect to `/ws/agentqa` and send `{"prompt": ...}`. Each prompt
//! is classified as `general`, `gui` or `api` and handed to the matching
//! handler:
//!
//! - `general` is answered in-process by [`agents::GeneralAgent`]
//! - `gui` is POSTed to the GUI testing worker ([`workers::GuiWorkerClient`])
//! - `api` is relayed over a WebSocket to the API testing worker
//!   ([`workers::ApiWorkerClient`])
//!
//! The same server exposes `/signup`, `/login` and `/users` backed by a
//! SQLite `users` table, plus health and metrics routes.
//!
//! ```rust
//! use agentqa::envelope::{ChatEnvelope, ClientMessage};
//! use agentqa::routing::{parse_label, TaskCategory};
//!
//! let message = ClientMessage::parse(r#"{"prompt": "run the petstore suite"}"#).unwrap();
//! assert_eq!(message.prompt, "run the petstore suite");
//! assert_eq!(parse_label("`api`"), Some(TaskCategory::Api));
//!
//! let reply = ChatEnvelope::general("hi", "hello");
//! assert_eq!(reply.chat_history.len(), 2);
//! ```

pub mod agents;
pub mod auth;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod llm;
pub mod observability;
pub mod routing;
pub mod server;
pub mod testing;
pub mod workers;

pub use config::*;
pub use dispatch::Dispatcher;
pub use envelope::{ChatEnvelope, ClientMessage, TurnReply};
pub use error::{GatewayError, GatewayResult};
pub use routing::{TaskCategory, TaskClassifier};
