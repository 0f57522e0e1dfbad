use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{metrics_utils::REQUEST_FAILED, model::ModelError, store::StoreError};

pub const MISSING_TEXT_MESSAGE: &str = "Bad Request, missing \"text\" field";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Request failures. Store and model details are logged, never returned to the caller.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request body has no string \"text\" field")]
    MissingText,

    #[error("missing or incorrect bearer token")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingText => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::MissingText => MISSING_TEXT_MESSAGE,
            ApiError::Unauthorized => UNAUTHORIZED_MESSAGE,
            ApiError::Store(_) | ApiError::Model(_) => {
                tracing::error!(error = %self, "request failed");
                metrics::counter!(REQUEST_FAILED).increment(1);
                INTERNAL_ERROR_MESSAGE
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MissingText.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Model(ModelError::Inference("boom".to_owned())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response =
            ApiError::Model(ModelError::Inference("secret detail".to_owned())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text, r#"{"error":"Internal Server Error"}"#);
        assert!(!text.contains("secret detail"));
    }
}
