mod config;
mod corpus;
mod errors;
mod generation;
mod llm_client;
mod render;
mod retrieval;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{BackendKind, Config};
use crate::corpus::ingest::load_corpus;
use crate::generation::narrative::LlmNarrativeGenerator;
use crate::generation::tone::ToneGuide;
use crate::llm_client::LlmClient;
use crate::render::PlainTextRenderer;
use crate::retrieval::embedder::{Embedder, HttpEmbedder};
use crate::retrieval::reranker::{HttpCrossEncoder, RelevanceScorer};
use crate::retrieval::service::RetrievalService;
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

    info!("Starting AppAssist API v{}", env!("CARGO_PKG_VERSION"));

    // Load and validate the master résumé
    let document = load_corpus(&config.corpus_path).await?;

    // Initialize retrieval collaborators
    let embedder = build_embedder(&config)?;
    let scorer = build_scorer(&config)?;

    // Build the first index; the service owns it from here on
    let retrieval =
        RetrievalService::build(document, embedder, scorer, config.retrieval).await?;
    info!(
        "Retrieval ready: semantic weight {}, shortlist {} → top {}",
        config.retrieval.weights.semantic,
        config.retrieval.shortlist_size,
        config.retrieval.rerank_top_k
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let tone = ToneGuide::load(&config.tone_examples_path).await?;

    let renderer = PlainTextRenderer::new(config.output_dir.clone());
    info!("Documents will be written to {}", renderer.output_dir().display());

    // Build app state
    let state = AppState {
        retrieval: Arc::new(retrieval),
        narrative: Arc::new(LlmNarrativeGenerator(llm)),
        tone: Arc::new(tone),
        renderer: Arc::new(renderer),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding_backend {
        BackendKind::Http => {
            info!(
                "Embedding via {} (model: {})",
                config.embedding_url, config.embedding_model
            );
            Ok(Arc::new(HttpEmbedder::new(
                &config.embedding_url,
                config.embedding_model.clone(),
                config.embedding_api_key.clone(),
            )?))
        }
        BackendKind::FastEmbed => local_embedder(),
    }
}

fn build_scorer(config: &Config) -> Result<Arc<dyn RelevanceScorer>> {
    match config.reranker_backend {
        BackendKind::Http => {
            info!(
                "Cross-encoder via {} (expecting {})",
                config.reranker_url, config.cross_encoder_model
            );
            Ok(Arc::new(HttpCrossEncoder::new(&config.reranker_url)?))
        }
        BackendKind::FastEmbed => local_scorer(),
    }
}

#[cfg(feature = "local-models")]
fn local_embedder() -> Result<Arc<dyn Embedder>> {
    info!("Embedding locally with fastembed (AllMiniLML6V2)");
    Ok(Arc::new(retrieval::embedder::FastEmbedder::try_new()?))
}

#[cfg(not(feature = "local-models"))]
fn local_embedder() -> Result<Arc<dyn Embedder>> {
    anyhow::bail!("EMBEDDING_BACKEND=fastembed needs a build with `--features local-models`")
}

#[cfg(feature = "local-models")]
fn local_scorer() -> Result<Arc<dyn RelevanceScorer>> {
    info!("Cross-encoder running locally with fastembed");
    Ok(Arc::new(retrieval::reranker::FastEmbedReranker::try_new()?))
}

#[cfg(not(feature = "local-models"))]
fn local_scorer() -> Result<Arc<dyn RelevanceScorer>> {
    anyhow::bail!("RERANKER_BACKEND=fastembed needs a build with `--features local-models`")
}
