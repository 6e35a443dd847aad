use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::auth::AuthError;

use super::error::ApiError;
use super::state::ApiState;

/// Rejects requests without a valid access token. On success the
/// [`Principal`](crate::application::auth::Principal) is available to
/// handlers and to the response logger.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let result = match extract_token(request.headers().get(AUTHORIZATION)) {
        Some(token) => state.auth.authenticate(&token).await,
        None => Err(AuthError::Missing),
    };

    let principal = match result {
        Ok(principal) => principal,
        Err(AuthError::Missing) | Err(AuthError::Invalid) => {
            return ApiError::unauthorized().into_response();
        }
        Err(AuthError::Expired) => return ApiError::token_expired().into_response(),
    };

    request.extensions_mut().insert(principal);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

/// Accepts `Bearer <token>` and `Token <token>`.
fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("Token "))?
        .trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
