use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const CACHE_HITS: &str = "embedding_api_cache_hits";
pub const CACHE_MISSES: &str = "embedding_api_cache_misses";
pub const INSERT_CONFLICTS: &str = "embedding_api_insert_conflicts";
pub const EMBEDDINGS_GENERATED: &str = "embedding_api_embeddings_generated";
pub const EMBEDDING_FAILED: &str = "embedding_api_embedding_failed";
pub const EMBEDDING_TIME: &str = "embedding_api_embedding_time_seconds";
pub const REQUEST_FAILED: &str = "embedding_api_request_failed";

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const BUCKETS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()
}

/// Middleware recording request counts and latency per route and status.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched_path) => matched_path.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let method = req.method().to_string();

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
