//! Per-session conversation history

use crate::error::GatewayResult;
use crate::llm::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifies one WebSocket connection
pub type SessionId = Uuid;

/// Storage for the running conversation of each session
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// History for `session`, oldest first. Unknown sessions are empty.
    async fn load(&self, session: SessionId) -> GatewayResult<Vec<Message>>;

    /// Append `messages` to the session in one step
    async fn commit(&self, session: SessionId, messages: Vec<Message>) -> GatewayResult<()>;

    /// Forget the session entirely
    async fn clear(&self, session: SessionId) -> GatewayResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<SessionId, Vec<Message>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, session: SessionId) -> GatewayResult<Vec<Message>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&session)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, session: SessionId, messages: Vec<Message>) -> GatewayResult<()> {
        self.sessions
            .write()
            .await
            .entry(session)
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn clear(&self, session: SessionId) -> GatewayResult<()> {
        self.sessions.write().await.remove(&session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_appends_in_order() {
        let store = InMemoryConversationStore::new();
        let session = Uuid::new_v4();
        store
            .commit(session, vec![Message::user("q1"), Message::assistant("a1")])
            .await
            .unwrap();
        store
            .commit(session, vec![Message::user("q2"), Message::assistant("a2")])
            .await
            .unwrap();

        let contents: Vec<_> = store
            .load(session)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryConversationStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.commit(a, vec![Message::user("only a")]).await.unwrap();

        assert_eq!(store.load(a).await.unwrap().len(), 1);
        assert!(store.load(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_session() {
        let store = InMemoryConversationStore::new();
        let session = Uuid::new_v4();
        store.commit(session, vec![Message::user("x")]).await.unwrap();
        store.clear(session).await.unwrap();

        assert!(store.load(session).await.unwrap().is_empty());
        assert_eq!(store.session_count().await, 0);
        store.clear(session).await.unwrap();
    }
}
