use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use shared::analysis::AnalysisError;
use shared::models::AnalyzeResponse;
use tracing::error;

use super::AppState;
use super::errors::{backend_error_response, bad_request_response};

pub(super) async fn analyze_transcription(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let transcription = body
        .get("transcription")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if transcription.is_empty() {
        return bad_request_response("transcription is required");
    }

    match state.analysis.analyze(transcription).await {
        Ok(result) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                todos: result.todos,
                key_points: result.key_points,
                next_actions: result.next_actions,
                summary: result.summary,
                success: true,
            }),
        )
            .into_response(),
        Err(AnalysisError::EmptyInput) => bad_request_response("transcription is required"),
        Err(AnalysisError::Backend(err)) => {
            error!("analysis backend failed: {err}");
            backend_error_response("Analysis failed", Some(err.to_string()))
        }
    }
}
