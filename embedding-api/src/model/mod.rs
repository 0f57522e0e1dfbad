mod local;
mod openai;

pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, EmbeddingBackend};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// An embedding model, opaque to the rest of the service: text in, vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier stored next to every vector this model produces.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f64>, ModelError>;
}

/// Build the embedder selected by `EMBEDDING_BACKEND`. Loading a local model
/// reads and initializes the ONNX weights, so this is called once at start-up.
pub fn from_config(config: &Config) -> Result<Arc<dyn Embedder>, ModelError> {
    match config.embedding_backend {
        EmbeddingBackend::Local => Ok(Arc::new(LocalEmbedder::load(
            &config.model_directory,
            config.model_pooling,
        )?)),
        EmbeddingBackend::OpenAi => Ok(Arc::new(OpenAiEmbedder::new(
            config.openai_api_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )?)),
    }
}
