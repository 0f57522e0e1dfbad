use std::sync::Arc;

use envconfig::Envconfig;
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use embedding_api::{
    app::{create_router, AppState},
    cache::EmbeddingCache,
    config::Config,
    metrics_utils::setup_metrics_recorder,
    model,
    store::{get_pool, EmbeddingStore, PostgresEmbeddingStore},
};

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() {
    let fmt_layer = fmt::layer().with_target(true).with_level(true).with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    let config = Config::init_from_env().expect("Invalid configuration:");

    let pool = get_pool(&config.postgres_dsn, &config.pool_options())
        .await
        .expect("failed to connect to postgres");
    let store = Arc::new(PostgresEmbeddingStore::new(pool));
    store
        .ensure_schema()
        .await
        .expect("failed to create embeddings schema");

    let embedder = model::from_config(&config).expect("failed to load embedding model");

    let metrics = config.enable_metrics.then(|| {
        setup_metrics_recorder().expect("failed to install prometheus recorder")
    });

    let state = AppState {
        cache: EmbeddingCache::new(store.clone(), embedder),
        store,
        bearer_token: config.bearer_token.clone(),
    };
    tracing::info!(model_id = state.cache.model_id(), "embedding model ready");
    if state.bearer_token.is_empty() {
        tracing::warn!("BEARER_TOKEN is empty, authentication is disabled");
    }

    let app = create_router(state, config.max_body_size, metrics);

    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .expect("could not bind port");
    tracing::info!("listening on {}", config.bind());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await
        .expect("server error");
}
