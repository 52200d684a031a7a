use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::analysis::AnalysisOrchestrator;
use shared::chat::ChatOrchestrator;
use shared::llm::SpeechToText;
use shared::repos::SessionStore;

mod analyze;
mod authn;
mod chat;
mod errors;
mod health;
mod identity;
mod transcribe;

const MAX_AUDIO_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct IdentityConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub analysis: Arc<AnalysisOrchestrator>,
    pub chat: Arc<ChatOrchestrator>,
    pub transcriber: Arc<dyn SpeechToText>,
    pub identity: IdentityConfig,
    pub http_client: reqwest::Client,
}

#[derive(Clone)]
pub(super) struct AuthUser {
    pub(super) user_id: String,
}

pub fn build_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/analyze", post(analyze::analyze_transcription))
        .with_state(app_state.clone());

    let auth_layer_state = app_state.clone();

    let protected_routes = Router::new()
        .route("/chat", post(chat::chat_message))
        .route("/transcribe", post(transcribe::transcribe_audio))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            auth_layer_state,
            authn::auth_middleware,
        ))
        .with_state(app_state);

    public_routes.merge(protected_routes)
}
