mod postgres;

pub use postgres::{get_pool, PoolOptions, PostgresEmbeddingStore};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Errors from the durable store. They all surface to callers as a generic internal failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed with: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("{command} query failed with: {error}")]
    Query {
        command: &'static str,
        #[source]
        error: sqlx::Error,
    },
}

/// A cached embedding as persisted in the `embeddings` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct EmbeddingRecord {
    pub id: i32,
    #[sqlx(rename = "hash")]
    pub fingerprint: String,
    #[sqlx(rename = "embedding")]
    pub vector: Vec<f64>,
    #[sqlx(rename = "model")]
    pub model_id: String,
}

/// Durable, insert-only mapping from (fingerprint, model) to an embedding vector.
///
/// Implementations must make `insert_if_absent` safe to race: when two callers
/// insert the same fingerprint, exactly one write survives and neither errors.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Create the backing table and lookup index if they don't exist yet.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// `Ok(None)` means no record; a stored empty vector comes back as `Some`.
    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        model_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError>;

    /// Store `vector` unless a record for `fingerprint` already exists, in which
    /// case the existing record is kept and nothing is written.
    async fn insert_if_absent(
        &self,
        fingerprint: &Fingerprint,
        vector: &[f64],
        model_id: &str,
    ) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
