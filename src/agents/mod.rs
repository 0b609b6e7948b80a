//! In-process responders and their per-session memory

pub mod conversation;
pub mod general;

pub use conversation::{ConversationStore, InMemoryConversationStore, SessionId};
pub use general::{GeneralAgent, GENERAL_AGENT_NAME};
