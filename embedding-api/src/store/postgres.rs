use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use super::{EmbeddingRecord, EmbeddingStore, StoreError};
use crate::fingerprint::Fingerprint;
use crate::metrics_utils::INSERT_CONFLICTS;

// Arbitrary, only needs to be unique among advisory locks taken on this database.
const SCHEMA_LOCK_ID: i64 = 0x656d_6265_6464_696e;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    id SERIAL PRIMARY KEY,
    hash VARCHAR(128) UNIQUE NOT NULL,
    embedding FLOAT[] NOT NULL,
    model VARCHAR(512) NOT NULL
)
"#;

const CREATE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_hash ON embeddings(hash, model)";

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

pub async fn get_pool(url: &str, options: &PoolOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(options.min_connections)
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .connect(url)
        .await
}

/// [`EmbeddingStore`] backed by the `embeddings` table in PostgreSQL.
///
/// Every operation checks a connection out of the pool and hands it back when
/// the guard drops, on success and on error alike.
#[derive(Clone)]
pub struct PostgresEmbeddingStore {
    pool: PgPool,
}

impl PostgresEmbeddingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingStore for PostgresEmbeddingStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Connection)?;

        // CREATE ... IF NOT EXISTS is not safe against itself when several
        // instances boot at once, so serialize them on an advisory lock.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_ID)
            .execute(&mut *tx)
            .await
            .map_err(|error| StoreError::Query {
                command: "LOCK",
                error,
            })?;

        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|error| StoreError::Query {
                    command: "CREATE",
                    error,
                })?;
        }

        tx.commit().await.map_err(|error| StoreError::Query {
            command: "COMMIT",
            error,
        })?;

        info!("embeddings schema is in place");
        Ok(())
    }

    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        model_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::Connection)?;

        sqlx::query_as::<_, EmbeddingRecord>(
            r#"
            SELECT id, hash, embedding, model FROM embeddings
            WHERE hash = $1 AND model = $2
            "#,
        )
        .bind(fingerprint.as_str())
        .bind(model_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|error| StoreError::Query {
            command: "SELECT",
            error,
        })
    }

    #[instrument(skip(self, fingerprint, vector), fields(fingerprint = %fingerprint, dimensions = vector.len()))]
    async fn insert_if_absent(
        &self,
        fingerprint: &Fingerprint,
        vector: &[f64],
        model_id: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::Connection)?;

        let result = sqlx::query(
            r#"
            INSERT INTO embeddings (hash, embedding, model)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash) DO NOTHING
            "#,
        )
        .bind(fingerprint.as_str())
        .bind(vector)
        .bind(model_id)
        .execute(&mut *conn)
        .await
        .map_err(|error| StoreError::Query {
            command: "INSERT",
            error,
        })?;

        if result.rows_affected() == 0 {
            debug!("embedding already stored, keeping existing record");
            counter!(INSERT_CONFLICTS).increment(1);
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|error| StoreError::Query {
                command: "SELECT",
                error,
            })?;
        Ok(())
    }
}
