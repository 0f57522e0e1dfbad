use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::ApiError};

/// Rejects requests whose `Authorization` header isn't exactly `Bearer <token>`.
/// An empty configured token lets every request through.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !is_authorized(
        &state.bearer_token,
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok()),
    ) {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

pub fn is_authorized(token: &str, header: Option<&str>) -> bool {
    if token.is_empty() {
        return true;
    }

    match header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(presented) => presented == token,
        None => false,
    }
}
