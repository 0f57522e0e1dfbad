use std::{sync::Arc, time::Instant};

use tracing::{debug, instrument};

use crate::{
    error::ApiError,
    fingerprint::fingerprint,
    metrics_utils::{
        CACHE_HITS, CACHE_MISSES, EMBEDDINGS_GENERATED, EMBEDDING_FAILED, EMBEDDING_TIME,
    },
    model::Embedder,
    store::EmbeddingStore,
};

/// Cache-aside lookup in front of the embedding model.
///
/// A hit returns the stored vector without touching the model. A miss embeds the
/// text, writes the result if no concurrent request got there first, and returns
/// the freshly computed vector. Two requests racing on the same new text may both
/// run the model; only one record is kept.
#[derive(Clone)]
pub struct EmbeddingCache {
    store: Arc<dyn EmbeddingStore>,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn EmbeddingStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    #[instrument(skip_all, fields(text_len = text.len()))]
    pub async fn get_or_create(&self, text: &str) -> Result<Vec<f64>, ApiError> {
        let fingerprint = fingerprint(text);
        let model_id = self.embedder.model_id();

        if let Some(record) = self.store.lookup(&fingerprint, model_id).await? {
            metrics::counter!(CACHE_HITS).increment(1);
            debug!(fingerprint = %fingerprint, "cache hit");
            return Ok(record.vector);
        }

        metrics::counter!(CACHE_MISSES).increment(1);
        debug!(fingerprint = %fingerprint, "cache miss");

        let start = Instant::now();
        let vector = match self.embedder.embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                metrics::counter!(EMBEDDING_FAILED).increment(1);
                return Err(e.into());
            }
        };
        metrics::histogram!(EMBEDDING_TIME).record(start.elapsed().as_secs_f64());
        metrics::counter!(EMBEDDINGS_GENERATED).increment(1);

        self.store
            .insert_if_absent(&fingerprint, &vector, model_id)
            .await?;

        Ok(vector)
    }
}
