//! Axum route handlers for the shortlist, package and corpus APIs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::ingest::load_corpus;
use crate::errors::AppError;
use crate::generation::generator::{generate_package, PackageRequest, PackageResponse};
use crate::generation::jd_parser::clean_jd_text;
use crate::retrieval::index::BulletRecord;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub jd_text: String,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    /// The JD as it was fed to retrieval.
    pub jd_text: String,
    pub bullets: Vec<BulletRecord>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub bullets: usize,
    pub items: usize,
}

#[derive(Debug, Deserialize)]
pub struct ItemBulletsQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ItemBulletsResponse {
    pub item_id: String,
    pub bullets: Vec<BulletRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/shortlist
///
/// Hybrid search → diversify → cross-encoder rerank. The caller confirms or edits
/// the returned bullets before asking for a package.
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Json(request): Json<ShortlistRequest>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let jd_text = clean_jd_text(&request.jd_text);
    if jd_text.is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let bullets = state.retrieval.shortlist(&jd_text).await?;
    info!("Shortlisted {} bullets", bullets.len());

    Ok(Json(ShortlistResponse { jd_text, bullets }))
}

/// POST /api/v1/package
///
/// Enforces inclusion policy on the confirmed selection, composes the narrative and
/// writes the plain-text résumé and cover letter.
pub async fn handle_package(
    State(state): State<AppState>,
    Json(request): Json<PackageRequest>,
) -> Result<Json<PackageResponse>, AppError> {
    let response = generate_package(
        &state.retrieval,
        state.narrative.as_ref(),
        &state.tone,
        state.renderer.as_ref(),
        &state.config.selection,
        request,
    )
    .await?;

    Ok(Json(response))
}

/// POST /api/v1/corpus/reload
///
/// Re-reads the corpus file and swaps in a freshly built index. On failure the
/// previous index stays live.
pub async fn handle_reload(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, AppError> {
    let document = load_corpus(&state.config.corpus_path).await?;
    let snapshot = state.retrieval.reload(document).await?;

    Ok(Json(ReloadResponse {
        bullets: snapshot.index.len(),
        items: snapshot.index.item_count(),
    }))
}

/// GET /api/v1/items/:item_id/bullets?q=
///
/// Every bullet of one item ranked by semantic similarity to `q`.
pub async fn handle_item_bullets(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(query): Query<ItemBulletsQuery>,
) -> Result<Json<ItemBulletsResponse>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::Validation("q cannot be empty".to_string()));
    }

    let snapshot = state.retrieval.snapshot().await;
    if snapshot.document.item(&item_id).is_none() {
        return Err(AppError::NotFound(format!("Item {item_id} not found")));
    }

    let bullets = state
        .retrieval
        .rank_item_bullets(&item_id, &query.q)
        .await?;

    Ok(Json(ItemBulletsResponse { item_id, bullets }))
}
