//! Conversation history storage keyed by session id.
//!
//! The orchestrator never owns history: callers load it from a
//! [`ConversationStore`], pass it to `orchestrate`, then append the new turn.
//! Sessions are created on first append and evicted after an idle period.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::agent::message::ChatMessage;
use crate::error::StorageError;

/// Storage backend for conversation histories.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a message, creating the session if needed.
    async fn append(&self, session_id: &str, message: ChatMessage) -> Result<(), StorageError>;

    /// Returns the session's messages, oldest first. Unknown sessions are empty.
    async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>, StorageError>;

    /// Drops a session. Returns whether it existed.
    async fn remove(&self, session_id: &str) -> Result<bool, StorageError>;

    /// Drops sessions idle for at least `max_idle`. Returns how many went.
    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StorageError>;
}

#[derive(Debug)]
struct Session {
    messages: Vec<ChatMessage>,
    last_active: Instant,
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, session_id: &str, message: ChatMessage) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                messages: Vec::new(),
                last_active: Instant::now(),
            });
        session.messages.push(message);
        session.last_active = Instant::now();
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default())
    }

    async fn remove(&self, session_id: &str) -> Result<bool, StorageError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StorageError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active.elapsed() < max_idle);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        Ok(evicted)
    }
}
