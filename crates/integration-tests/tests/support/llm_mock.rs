use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use shared::llm::{
    AudioPayload, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmRequest, LlmResponse,
    RawToolCall, RawToolResult, SpeechToText, TranscriptionFuture,
};

/// Backend stub that replays a fixed script of responses and records every
/// request it receives.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<LlmResponse, LlmGatewayError>>>,
    captured: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Result<LlmResponse, LlmGatewayError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            captured: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<LlmRequest> {
        self.captured.lock().expect("captured lock").clone()
    }
}

impl LlmGateway for ScriptedGateway {
    fn generate<'a>(&'a self, request: LlmRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.captured.lock().expect("captured lock").push(request);
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LlmGatewayError::ProviderFailure(
                        "no scripted response".to_string(),
                    ))
                })
        })
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        model: "scripted".to_string(),
        provider_request_id: None,
        text: text.to_string(),
        tool_calls: Vec::new(),
        tool_results: Vec::new(),
        usage: None,
    }
}

pub fn tool_response(
    text: &str,
    tool_calls: Vec<RawToolCall>,
    tool_results: Vec<RawToolResult>,
) -> LlmResponse {
    LlmResponse {
        model: "scripted".to_string(),
        provider_request_id: None,
        text: text.to_string(),
        tool_calls,
        tool_results,
        usage: None,
    }
}

/// Speech-to-text stub returning one fixed transcript, with the received
/// payloads recorded for inspection.
pub struct ScriptedTranscriber {
    transcript: Result<String, LlmGatewayError>,
    received: Mutex<Vec<AudioPayload>>,
}

impl ScriptedTranscriber {
    pub fn new(transcript: Result<String, LlmGatewayError>) -> Self {
        Self {
            transcript,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<AudioPayload> {
        self.received.lock().expect("received lock").clone()
    }
}

impl SpeechToText for ScriptedTranscriber {
    fn transcribe<'a>(&'a self, audio: AudioPayload) -> TranscriptionFuture<'a> {
        Box::pin(async move {
            self.received.lock().expect("received lock").push(audio);
            self.transcript.clone()
        })
    }
}
