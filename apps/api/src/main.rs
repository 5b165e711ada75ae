mod config;
mod db;
mod embedding;
mod errors;
mod identity;
mod llm_client;
mod matching;
mod models;
mod profile;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::HttpEmbeddingClient;
use crate::identity::clusters::LeadingComponentsProjector;
use crate::llm_client::LlmClient;
use crate::matching::retriever::PgClaimIndex;
use crate::profile::cache::PgProfileStore;
use crate::profile::generator::LlmProfileGenerator;
use crate::rate_limit::RateLimiter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting claims matching API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.database_max_connections).await?;

    // Profile pipeline: LLM client behind the generator seam, storage behind
    // the store seam
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let profile_generator = Arc::new(LlmProfileGenerator::new(llm));
    let profile_store = Arc::new(PgProfileStore::new(db.clone()));

    // Initialize embedding provider
    let embedder = Arc::new(HttpEmbeddingClient::new(
        config.embeddings_api_url.clone(),
        config.embeddings_api_key.clone(),
        config.embeddings_model.clone(),
    ));
    info!("Embedding client initialized (model: {})", config.embeddings_model);

    // Claim index over pgvector
    let claim_index = Arc::new(PgClaimIndex::new(db.clone()));

    // Cluster projection collaborator (leading-components until the real
    // reducer service is wired in)
    let projector = Arc::new(LeadingComponentsProjector);

    // Rate limiter with explicit lifecycle, owned here
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    ));
    rate_limiter.start();

    // Build app state
    let state = AppState {
        db,
        embedder,
        claim_index,
        projector,
        profile_store,
        profile_generator,
        rate_limiter: rate_limiter.clone(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    rate_limiter.shutdown();

    Ok(())
}
