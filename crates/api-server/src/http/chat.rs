use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use shared::chat::ChatError;
use shared::models::{ChatRequest, ChatResponse};
use tracing::error;

use super::errors::{backend_error_response, bad_request_response, unauthorized_response};
use super::{AppState, AuthUser};

pub(super) async fn chat_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let message = body.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return bad_request_response("message is required");
    }

    match state
        .chat
        .converse(
            &auth.user_id,
            message,
            body.thread_id,
            body.transcript_context.as_deref(),
        )
        .await
    {
        Ok(reply) => (
            StatusCode::OK,
            Json(ChatResponse {
                text: reply.text,
                thread_id: reply.thread_id,
            }),
        )
            .into_response(),
        Err(ChatError::EmptyMessage) => bad_request_response("message is required"),
        Err(ChatError::Unauthenticated) => unauthorized_response(),
        Err(ChatError::Backend(err)) => {
            error!("chat backend failed: {err}");
            backend_error_response("Chat failed", Some(err.to_string()))
        }
        Err(ChatError::Store(err)) => {
            error!("chat history load failed: {err}");
            backend_error_response("Chat failed", Some(err.to_string()))
        }
    }
}
