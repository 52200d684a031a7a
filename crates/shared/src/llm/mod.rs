pub mod gateway;
pub mod openai;
pub mod transcribe;

pub use gateway::{
    ChatTurn, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmRequest, LlmResponse,
    LlmTokenUsage, RawToolCall, RawToolResult, ToolSpec,
};
pub use openai::{OpenAiConfigError, OpenAiGateway, OpenAiGatewayConfig, OpenAiModelRoute};
pub use transcribe::{
    AudioPayload, OpenAiTranscriber, OpenAiTranscriberConfig, SpeechToText, TranscriptionFuture,
};
