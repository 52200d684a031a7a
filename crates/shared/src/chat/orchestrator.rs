use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::memory::SessionMemory;
use crate::llm::{ChatTurn, LlmGateway, LlmGatewayError, LlmRequest};
use crate::models::ChatRole;
use crate::repos::{SessionStore, StoreError};

pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant discussing the user's meeting \
and voice-memo transcripts. Answer questions about what was said, summarize on request, and \
keep answers grounded in the conversation so far. Be concise.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request is not authenticated")]
    Unauthenticated,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Backend(#[from] LlmGatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub thread_id: Uuid,
}

/// Threaded chat over session memory. Each call loads the thread history,
/// appends the user turn, queries the backend with the full conversation and
/// appends the assistant turn.
pub struct ChatOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    memory: SessionMemory,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn LlmGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            gateway,
            memory: SessionMemory::new(store),
        }
    }

    pub async fn converse(
        &self,
        user_id: &str,
        message: &str,
        thread_id: Option<Uuid>,
        transcript_context: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ChatError::Unauthenticated);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let thread_id = self.memory.resolve_thread(thread_id);

        // Without history the reply would silently lose the whole thread, so
        // a load failure is fatal. Append failures below are not.
        let history = self.memory.history(user_id, thread_id).await?;

        // Transcript context applies to new threads only; an existing thread
        // already carries it in its first stored turn.
        let current_turn = match transcript_context {
            Some(context) if history.is_empty() && !context.trim().is_empty() => {
                SessionMemory::with_transcript_context(message, context.trim())
            }
            _ => message.to_string(),
        };

        if let Err(err) = self
            .memory
            .append(user_id, thread_id, ChatRole::User, &current_turn)
            .await
        {
            warn!(%thread_id, error = %err, "failed to persist user turn");
        }

        let mut turns: Vec<ChatTurn> = history
            .into_iter()
            .map(|message| ChatTurn {
                role: message.role,
                content: message.content,
            })
            .collect();
        turns.push(ChatTurn {
            role: ChatRole::User,
            content: current_turn,
        });

        let request = LlmRequest {
            requester_id: None,
            system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
            turns,
            tools: Vec::new(),
            temperature: DEFAULT_CHAT_TEMPERATURE,
        }
        .with_requester_id(user_id);

        let response = self.gateway.generate(request).await?;
        let text = response.text.trim().to_string();

        if let Err(err) = self
            .memory
            .append(user_id, thread_id, ChatRole::Assistant, &text)
            .await
        {
            warn!(%thread_id, error = %err, "failed to persist assistant turn");
        }

        Ok(ChatReply { text, thread_id })
    }
}
