use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::errors::{bad_gateway_response, unauthorized_response};
use super::identity::{IdentityError, verify_identity_token};
use super::{AppState, AuthUser};

pub(super) async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        warn!("missing or invalid authorization header");
        return unauthorized_response();
    };

    let identity = match verify_identity_token(
        &state.http_client,
        &state.identity.jwks_url,
        &state.identity.issuer,
        &state.identity.audience,
        token,
    )
    .await
    {
        Ok(identity) => identity,
        Err(IdentityError::InvalidToken { message }) => {
            warn!("auth rejected: {message}");
            return unauthorized_response();
        }
        Err(IdentityError::UpstreamUnavailable { message }) => {
            warn!("auth upstream unavailable: {message}");
            return bad_gateway_response(message);
        }
    };

    req.extensions_mut().insert(AuthUser {
        user_id: identity.subject,
    });
    next.run(req).await
}
