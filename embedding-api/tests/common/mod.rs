#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use tower::ServiceExt;

use embedding_api::app::{create_router, AppState};
use embedding_api::cache::EmbeddingCache;
use embedding_api::config::Config;
use embedding_api::fingerprint::Fingerprint;
use embedding_api::model::{Embedder, ModelError};
use embedding_api::store::{EmbeddingRecord, EmbeddingStore, StoreError};

pub const TEST_MODEL: &str = "test-model";

/// In-memory store with the same uniqueness rule as the `embeddings` table:
/// one record per fingerprint, first write wins.
#[derive(Default)]
pub struct MockEmbeddingStore {
    records: Mutex<HashMap<String, EmbeddingRecord>>,
    failing: bool,
}

impl MockEmbeddingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            failing: true,
            ..Default::default()
        })
    }

    pub fn records(&self) -> Vec<EmbeddingRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Connection(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for MockEmbeddingStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        model_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(fingerprint.as_str())
            .filter(|r| r.model_id == model_id)
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        fingerprint: &Fingerprint,
        vector: &[f64],
        model_id: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i32 + 1;
        records
            .entry(fingerprint.to_string())
            .or_insert_with(|| EmbeddingRecord {
                id,
                fingerprint: fingerprint.to_string(),
                vector: vector.to_vec(),
                model_id: model_id.to_owned(),
            });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check()
    }
}

/// Deterministic embedder: the vector depends only on the text. Counts calls.
pub struct MockEmbedder {
    calls: AtomicUsize,
    delay: Duration,
    failing: bool,
    panicking: bool,
}

impl MockEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: false,
            panicking: false,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            failing: false,
            panicking: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: true,
            panicking: false,
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: false,
            panicking: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn vector_for(text: &str) -> Vec<f64> {
    vec![text.len() as f64, 0.5, -0.25]
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_id(&self) -> &str {
        TEST_MODEL
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panicking {
            panic!("model session crashed");
        }
        if self.failing {
            return Err(ModelError::Inference("model exploded".to_owned()));
        }
        Ok(vector_for(text))
    }
}

pub struct TestHarness {
    pub app: Router,
    pub store: Arc<MockEmbeddingStore>,
    pub embedder: Arc<MockEmbedder>,
    token: String,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    pub async fn post_embedding(&self, body: serde_json::Value) -> Response<Body> {
        self.post_raw(serde_json::to_string(&body).unwrap()).await
    }

    pub async fn post_raw(&self, body: impl Into<Body>) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/embedding")
                .header(header::CONTENT_TYPE, "application/json"),
            body.into(),
        )
        .await
    }

    pub async fn post_with_auth(
        &self,
        authorization: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/embedding")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.app
            .clone()
            .oneshot(
                builder
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let builder = if self.token.is_empty() {
            builder
        } else {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token))
        };
        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}

#[derive(Default)]
pub struct TestHarnessBuilder {
    token: Option<String>,
    store: Option<Arc<MockEmbeddingStore>>,
    embedder: Option<Arc<MockEmbedder>>,
    max_body_size: Option<usize>,
}

impl TestHarnessBuilder {
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_owned());
        self
    }

    pub fn with_store(mut self, store: Arc<MockEmbeddingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<MockEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    pub fn build(self) -> TestHarness {
        let mut config = Config::default_for_test();
        if let Some(token) = self.token {
            config.bearer_token = token;
        }
        if let Some(max_body_size) = self.max_body_size {
            config.max_body_size = max_body_size;
        }

        let store = self.store.unwrap_or_else(MockEmbeddingStore::new);
        let embedder = self.embedder.unwrap_or_else(MockEmbedder::new);

        let state = AppState {
            cache: EmbeddingCache::new(store.clone(), embedder.clone()),
            store: store.clone(),
            bearer_token: config.bearer_token.clone(),
        };

        TestHarness {
            app: create_router(state, config.max_body_size, None),
            store,
            embedder,
            token: config.bearer_token,
        }
    }
}
