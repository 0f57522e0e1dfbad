use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{Embedder, ModelError};

#[derive(Serialize)]
struct EmbeddingRequestBody<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponseBody {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

/// Embeds text through an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(url: String, api_key: String, model: String) -> Result<Self, ModelError> {
        if api_key.is_empty() {
            return Err(ModelError::Load(
                "OPENAI_API_KEY must be set for the openai backend".to_owned(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, ModelError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequestBody {
                input: text,
                model: &self.model,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Failed to generate embeddings, got {} from model api", status);
            if let Ok(error_message) = response.text().await {
                error!("Error message from model api: {}", error_message);
            }
            return Err(ModelError::InvalidResponse(format!(
                "unexpected status {status}"
            )));
        }

        let body: EmbeddingResponseBody = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ModelError::InvalidResponse("response contained no embedding".to_owned()))
    }
}
