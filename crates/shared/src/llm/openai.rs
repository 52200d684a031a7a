use std::env;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::sleep;

use super::gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmRequest, LlmResponse, LlmTokenUsage,
    RawToolCall, RawToolResult,
};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 250;

const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiModelRoute {
    pub primary_model: String,
    pub fallback_model: Option<String>,
}

impl OpenAiModelRoute {
    fn candidate_models(&self) -> Vec<&str> {
        let mut candidates = Vec::new();
        if !self.primary_model.is_empty() {
            candidates.push(self.primary_model.as_str());
        }

        if let Some(fallback_model) = self.fallback_model.as_deref()
            && !fallback_model.is_empty()
            && fallback_model != self.primary_model
        {
            candidates.push(fallback_model);
        }

        candidates
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
    pub model_route: OpenAiModelRoute,
}

impl OpenAiGatewayConfig {
    pub fn from_env() -> Result<Self, OpenAiConfigError> {
        let api_key = require_non_empty_env("OPENAI_API_KEY")?;
        let chat_completions_url = optional_trimmed_env("OPENAI_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        if !chat_completions_url.starts_with("http://")
            && !chat_completions_url.starts_with("https://")
        {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "OPENAI_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            chat_completions_url,
            api_key,
            timeout_ms: parse_u64_env("OPENAI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_retries: parse_u32_env("OPENAI_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_base_backoff_ms: parse_u64_env(
                "OPENAI_RETRY_BASE_BACKOFF_MS",
                DEFAULT_RETRY_BASE_BACKOFF_MS,
            )?,
            model_route: parse_model_route(),
        })
    }
}

#[derive(Debug, Error)]
pub enum OpenAiConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build OpenAI http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn generate_for_model(
        &self,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, ModelAttemptError> {
        let mut attempt = 0_u32;

        loop {
            match self.send_once(model, request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if err.retryable && attempt < self.config.max_retries {
                        let backoff_multiplier = 2_u64.saturating_pow(attempt);
                        let backoff_ms = self
                            .config
                            .retry_base_backoff_ms
                            .saturating_mul(backoff_multiplier);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Err(ModelAttemptError {
                        error: err.error,
                        fallback_allowed: err.fallback_allowed,
                    });
                }
            }
        }
    }

    async fn send_once(
        &self,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, SendAttemptError> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(json!({ "role": "system", "content": request.system_prompt }));
        for turn in &request.turns {
            messages.push(json!({ "role": turn.role.as_str(), "content": turn.content }));
        }

        let mut request_body = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect::<Vec<_>>();
            request_body["tools"] = Value::Array(tools);
            request_body["tool_choice"] = json!("auto");
        }

        if let Some(requester_id) = request.requester_id.as_deref() {
            request_body["user"] = json!(requester_id);
        }

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                let error = if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                };
                SendAttemptError::retryable(error, true)
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|_| {
            SendAttemptError::non_retryable(
                LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string()),
                true,
            )
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            let is_retryable = is_retryable_status(status);
            let fallback_allowed =
                status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN;
            return Err(SendAttemptError {
                error: LlmGatewayError::ProviderFailure(format!(
                    "status={} code={provider_code}",
                    status.as_u16()
                )),
                retryable: is_retryable,
                fallback_allowed,
            });
        }

        let mut parsed = parse_success_body(model, &body)
            .map_err(|error| SendAttemptError::non_retryable(error, true))?;
        if parsed.provider_request_id.is_none() {
            parsed.provider_request_id = header_request_id;
        }

        Ok(parsed)
    }
}

impl LlmGateway for OpenAiGateway {
    fn generate<'a>(&'a self, request: LlmRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            let candidate_models = self.config.model_route.candidate_models();

            for (index, model) in candidate_models.iter().enumerate() {
                match self.generate_for_model(model, &request).await {
                    Ok(response) => return Ok(response),
                    Err(model_err) => {
                        let has_more_candidates = index + 1 < candidate_models.len();
                        if has_more_candidates && model_err.fallback_allowed {
                            continue;
                        }
                        return Err(model_err.error);
                    }
                }
            }

            Err(LlmGatewayError::ProviderFailure(
                "no_openai_model_candidates".to_string(),
            ))
        })
    }
}

/// Parses a successful chat-completions body into the normalized response.
/// Invocation records are read from both observed locations: the message's
/// flattened `tool_calls` list and, on provider revisions that surface it,
/// a separate `tool_results` list.
fn parse_success_body(fallback_model: &str, body: &str) -> Result<LlmResponse, LlmGatewayError> {
    let parsed: OpenAiSuccessResponse = serde_json::from_str(body).map_err(|_| {
        LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmGatewayError::InvalidProviderPayload("missing_choice".to_string()))?;

    let text = match choice.message.content {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(_) => {
            return Err(LlmGatewayError::InvalidProviderPayload(
                "unsupported_content_shape".to_string(),
            ));
        }
    };

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| RawToolCall {
            name: call.function.name,
            arguments: decode_tool_arguments(call.function.arguments),
        })
        .collect();

    let tool_results = choice
        .message
        .tool_results
        .as_ref()
        .map(parse_tool_results)
        .unwrap_or_default();

    Ok(LlmResponse {
        model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
        provider_request_id: parsed.id,
        text,
        tool_calls,
        tool_results,
        usage: parsed.usage.map(|usage| LlmTokenUsage {
            prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
            completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
            total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
        }),
    })
}

/// Call arguments arrive as a JSON-encoded string on current revisions and
/// as a plain object on older ones.
fn decode_tool_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) => serde_json::from_str::<Value>(&raw).unwrap_or(Value::Null),
        other => other,
    }
}

fn parse_tool_results(raw: &Value) -> Vec<RawToolResult> {
    let Value::Array(entries) = raw else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry
                .get("name")
                .or_else(|| entry.get("toolName"))
                .and_then(Value::as_str)?;
            let result = entry
                .get("result")
                .or_else(|| entry.get("output"))
                .cloned()?;
            Some(RawToolResult {
                name: name.to_string(),
                result,
            })
        })
        .collect()
}

#[derive(Debug)]
struct SendAttemptError {
    error: LlmGatewayError,
    retryable: bool,
    fallback_allowed: bool,
}

impl SendAttemptError {
    fn retryable(error: LlmGatewayError, fallback_allowed: bool) -> Self {
        Self {
            error,
            retryable: true,
            fallback_allowed,
        }
    }

    fn non_retryable(error: LlmGatewayError, fallback_allowed: bool) -> Self {
        Self {
            error,
            retryable: false,
            fallback_allowed,
        }
    }
}

#[derive(Debug)]
struct ModelAttemptError {
    error: LlmGatewayError,
    fallback_allowed: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiSuccessResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(default)]
    tool_results: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    function: OpenAiToolFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolFunction {
    name: String,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn parse_model_route() -> OpenAiModelRoute {
    OpenAiModelRoute {
        primary_model: optional_trimmed_env("OPENAI_MODEL_PRIMARY")
            .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
        fallback_model: optional_trimmed_env("OPENAI_MODEL_FALLBACK"),
    }
}

fn require_non_empty_env(key: &str) -> Result<String, OpenAiConfigError> {
    let value = env::var(key).map_err(|_| OpenAiConfigError::MissingVar(key.to_string()))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OpenAiConfigError::MissingVar(key.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, OpenAiConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| OpenAiConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32, OpenAiConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| OpenAiConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok();
    let Some(provider_error_code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match provider_error_code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_success_body;

    #[test]
    fn parse_success_body_reads_text_and_string_encoded_tool_arguments() {
        let body = json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "content": "Extracted two todos.",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "create-todo",
                            "arguments": "{\"todos\":[{\"task\":\"Prepare slides\",\"priority\":\"high\"}]}"
                        }
                    }]
                }
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
        .to_string();

        let parsed = parse_success_body("gpt-4o-mini", &body).expect("body should parse");

        assert_eq!(parsed.text, "Extracted two todos.");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].name, "create-todo");
        assert_eq!(
            parsed.tool_calls[0].arguments["todos"][0]["task"],
            "Prepare slides"
        );
        assert!(parsed.tool_results.is_empty());
        assert_eq!(parsed.usage.expect("usage should parse").total_tokens, 15);
    }

    #[test]
    fn parse_success_body_reads_separate_tool_results_when_present() {
        let body = json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_results": [
                        { "toolName": "extract-key-points", "output": { "keyPoints": [] } },
                        { "name": "create-summary", "result": { "summary": "short", "keyTopics": [] } }
                    ]
                }
            }]
        })
        .to_string();

        let parsed = parse_success_body("gpt-4o-mini", &body).expect("body should parse");

        assert!(parsed.text.is_empty());
        assert_eq!(parsed.tool_results.len(), 2);
        assert_eq!(parsed.tool_results[0].name, "extract-key-points");
        assert_eq!(parsed.tool_results[1].result["summary"], "short");
    }

    #[test]
    fn parse_success_body_rejects_missing_choice() {
        let body = json!({ "model": "gpt-4o-mini", "choices": [] }).to_string();
        assert!(parse_success_body("gpt-4o-mini", &body).is_err());
    }
}
