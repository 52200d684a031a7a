use std::env;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::gateway::LlmGatewayError;
use super::openai::OpenAiConfigError;

const DEFAULT_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_TRANSCRIPTION_LANGUAGE: &str = "ja";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub type TranscriptionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, LlmGatewayError>> + Send + 'a>>;

/// Raw audio handed to the speech-to-text backend, together with the upload
/// metadata the multipart form needs.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

pub trait SpeechToText: Send + Sync {
    fn transcribe<'a>(&'a self, audio: AudioPayload) -> TranscriptionFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct OpenAiTranscriberConfig {
    pub transcriptions_url: String,
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub timeout_ms: u64,
}

impl OpenAiTranscriberConfig {
    pub fn from_env() -> Result<Self, OpenAiConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| OpenAiConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let timeout_ms = match env::var("OPENAI_TRANSCRIPTION_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| OpenAiConfigError::ParseInt {
                    key: "OPENAI_TRANSCRIPTION_TIMEOUT_MS".to_string(),
                    value: raw,
                })?,
            Err(_) => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            transcriptions_url: env::var("OPENAI_TRANSCRIPTIONS_URL")
                .unwrap_or_else(|_| DEFAULT_TRANSCRIPTIONS_URL.to_string()),
            api_key,
            model: env::var("OPENAI_TRANSCRIPTION_MODEL")
                .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            language: env::var("TRANSCRIPTION_LANGUAGE")
                .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_LANGUAGE.to_string()),
            timeout_ms,
        })
    }
}

#[derive(Clone)]
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    config: OpenAiTranscriberConfig,
}

impl OpenAiTranscriber {
    pub fn new(config: OpenAiTranscriberConfig) -> Result<Self, OpenAiConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn transcribe_inner(&self, audio: AudioPayload) -> Result<String, LlmGatewayError> {
        let file_part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .map_err(|_| {
                LlmGatewayError::InvalidProviderPayload("invalid_audio_mime_type".to_string())
            })?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone());

        let response = self
            .client
            .post(&self.config.transcriptions_url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            return Err(LlmGatewayError::ProviderFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        Ok(parsed.text)
    }
}

impl SpeechToText for OpenAiTranscriber {
    fn transcribe<'a>(&'a self, audio: AudioPayload) -> TranscriptionFuture<'a> {
        Box::pin(self.transcribe_inner(audio))
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}
