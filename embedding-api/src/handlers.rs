use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;

use crate::{
    app::AppState,
    error::{ApiError, Result},
};

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,
}

/// Any body that isn't a JSON object carrying a string `text` is treated as a missing field.
pub fn parse_request(body: &[u8]) -> Result<EmbeddingRequest> {
    serde_json::from_slice(body).map_err(|_| ApiError::MissingText)
}

pub async fn create_embedding(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<f64>>> {
    let request = parse_request(&body)?;
    let vector = state.cache.get_or_create(&request.text).await?;
    Ok(Json(vector))
}
