use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::ChatRole;

pub type LlmGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<LlmResponse, LlmGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// A callable operation bound to a generative request. The backend may
/// propose invocations of these by name; it never executes anything itself.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub requester_id: Option<String>,
    pub system_prompt: String,
    pub turns: Vec<ChatTurn>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
}

impl LlmRequest {
    pub fn single_turn(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            requester_id: None,
            system_prompt: system_prompt.into(),
            turns: vec![ChatTurn {
                role: ChatRole::User,
                content: user_message.into(),
            }],
            tools: Vec::new(),
            temperature: 1.0,
        }
    }

    pub fn with_requester_id(mut self, requester_id: impl AsRef<str>) -> Self {
        let trimmed = requester_id.as_ref().trim();
        if !trimmed.is_empty() {
            self.requester_id = Some(trimmed.to_string());
        }
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmTokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A tool invocation proposal reported in the flattened call list: the
/// operation name plus the backend-proposed arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: Value,
}

/// A tool invocation reported in the separate result list that some provider
/// revisions emit alongside (or instead of) the call list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToolResult {
    pub name: String,
    pub result: Value,
}

/// Normalized backend reply. `text` is the top-level free-text answer;
/// `tool_calls` and `tool_results` are the two locations invocation records
/// have been observed in across provider revisions. Neither is authoritative
/// on its own.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub model: String,
    pub provider_request_id: Option<String>,
    pub text: String,
    pub tool_calls: Vec<RawToolCall>,
    pub tool_results: Vec<RawToolResult>,
    pub usage: Option<LlmTokenUsage>,
}

#[derive(Debug, Clone, Error)]
pub enum LlmGatewayError {
    #[error("llm provider request timed out")]
    Timeout,
    #[error("llm provider request failed: {0}")]
    ProviderFailure(String),
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

pub trait LlmGateway: Send + Sync {
    fn generate<'a>(&'a self, request: LlmRequest) -> LlmGatewayFuture<'a>;
}
