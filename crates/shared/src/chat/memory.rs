use std::sync::Arc;

use uuid::Uuid;

use crate::models::{ChatMessage, ChatRole};
use crate::repos::{SessionStore, StoreError};

/// Conversation memory keyed by `(owner, thread)`. Wraps the session store
/// with the thread-resolution and context-formatting rules the chat flow
/// relies on.
#[derive(Clone)]
pub struct SessionMemory {
    store: Arc<dyn SessionStore>,
}

impl SessionMemory {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Uses the caller-supplied thread id, or mints a fresh one for a new
    /// conversation. An unknown supplied id simply names an empty thread.
    pub fn resolve_thread(&self, supplied: Option<Uuid>) -> Uuid {
        supplied.unwrap_or_else(Uuid::new_v4)
    }

    pub async fn history(
        &self,
        owner: &str,
        thread_id: Uuid,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.load_thread_messages(owner, thread_id).await
    }

    pub async fn append(
        &self,
        owner: &str,
        thread_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<(), StoreError> {
        self.store
            .append_thread_message(owner, thread_id, None, role, content)
            .await
    }

    /// Prepends a transcript excerpt to a user message so the backend sees
    /// what the user is asking about.
    pub fn with_transcript_context(message: &str, context: &str) -> String {
        format!(
            "Transcript under discussion:\n{context}\n\nUser message:\n{message}"
        )
    }
}
