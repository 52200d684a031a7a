use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use shared::llm::AudioPayload;
use shared::models::{NewRecording, TranscribeResponse};
use tracing::{error, warn};

use super::errors::{backend_error_response, bad_request_response};
use super::{AppState, AuthUser};

pub(super) async fn transcribe_audio(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Response {
    let mut audio: Option<AudioPayload> = None;
    let mut audio_url = String::new();
    let mut duration_seconds = 0.0_f64;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("malformed multipart body: {err}");
                return bad_request_response("multipart body is malformed");
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "audio" => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("audio.webm")
                    .to_string();
                let mime_type = field
                    .content_type()
                    .filter(|mime| !mime.is_empty())
                    .unwrap_or("audio/webm")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        audio = Some(AudioPayload {
                            bytes: bytes.to_vec(),
                            file_name,
                            mime_type,
                        });
                    }
                    Err(err) => {
                        warn!("failed to read audio field: {err}");
                        return bad_request_response("audio field could not be read");
                    }
                }
            }
            "audioUrl" => {
                audio_url = field.text().await.unwrap_or_default();
            }
            "duration" => {
                duration_seconds = field
                    .text()
                    .await
                    .ok()
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
                    .unwrap_or(0.0);
            }
            _ => {}
        }
    }

    let Some(audio) = audio else {
        return bad_request_response("audio file is required");
    };
    if audio.bytes.is_empty() {
        return bad_request_response("audio file is required");
    }

    let text = match state.transcriber.transcribe(audio).await {
        Ok(text) => text,
        Err(err) => {
            error!("transcription backend failed: {err}");
            return backend_error_response("Transcription failed", Some(err.to_string()));
        }
    };

    // The transcription result is still returned when persistence fails.
    let recording = NewRecording {
        audio_url,
        transcription: text.clone(),
        duration_seconds,
    };
    if let Err(err) = state.store.save_recording(&auth.user_id, &recording).await {
        warn!("failed to persist recording: {err}");
    }

    (
        StatusCode::OK,
        Json(TranscribeResponse {
            text,
            user_id: auth.user_id,
        }),
    )
        .into_response()
}
