use std::{any::Any, future::ready, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    auth::auth_middleware,
    cache::EmbeddingCache,
    error::INTERNAL_ERROR_MESSAGE,
    handlers::create_embedding,
    metrics_utils::track_metrics,
    store::EmbeddingStore,
};

#[derive(Clone)]
pub struct AppState {
    pub cache: EmbeddingCache,
    pub store: Arc<dyn EmbeddingStore>,
    pub bearer_token: String,
}

pub fn create_router(
    state: AppState,
    max_body_size: usize,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/_liveness", get(liveness))
        .route("/_readiness", get(readiness))
        .route(
            "/embedding",
            post(create_embedding).layer(DefaultBodyLimit::max(max_body_size)),
        );

    let router = match metrics {
        Some(handle) => router.route("/metrics", get(move || ready(handle.render()))),
        None => router,
    };

    router
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_metrics))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn index() -> &'static str {
    "embedding-api"
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    state.store.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok("ok")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}
