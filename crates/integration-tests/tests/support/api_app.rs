use std::sync::Arc;
use std::time::Duration;

use api_server::http::{AppState, build_router};
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use shared::analysis::AnalysisOrchestrator;
use shared::chat::ChatOrchestrator;
use shared::llm::{LlmGateway, SpeechToText};
use shared::repos::SessionStore;
use tower::ServiceExt;

pub async fn build_test_router(
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn LlmGateway>,
    transcriber: Arc<dyn SpeechToText>,
    idp: &super::identity::IdentityProvider,
) -> axum::Router {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("http client should initialize");

    build_router(AppState {
        analysis: Arc::new(AnalysisOrchestrator::new(gateway.clone())),
        chat: Arc::new(ChatOrchestrator::new(gateway, store.clone())),
        transcriber,
        store,
        identity: idp.config(),
        http_client,
    })
}

pub struct JsonResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub async fn send_json(app: &axum::Router, request: Request<Body>) -> JsonResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));

    JsonResponse { status, body }
}

pub fn request(
    method: Method,
    uri: &str,
    auth_header: Option<&str>,
    json_body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth_header) = auth_header {
        builder = builder.header(header::AUTHORIZATION, auth_header);
    }

    match json_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

/// Builds a multipart upload with an `audio` file part plus optional text
/// parts, matching what a browser form submit produces.
pub fn multipart_request(
    uri: &str,
    auth_header: Option<&str>,
    audio: Option<&[u8]>,
    text_fields: &[(&str, &str)],
) -> Request<Body> {
    const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

    let mut body = Vec::new();
    if let Some(audio) = audio {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; \
filename=\"memo.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(audio);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in text_fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth_header) = auth_header {
        builder = builder.header(header::AUTHORIZATION, auth_header);
    }

    builder
        .body(Body::from(body))
        .expect("request should build")
}
