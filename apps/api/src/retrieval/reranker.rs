//! Cross-encoder re-ranking of the diversified shortlist.
//!
//! The pipeline is: hybrid search (top-N) → diversify → cross-encoder re-rank → top-K.
//! The cross-encoder scores (query, candidate) pairs jointly and only sees the
//! diversified list.
//!
//! No fallback: an unavailable model fails the request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retrieval::index::BulletRecord;
use crate::retrieval::RetrievalError;

/// Pairwise relevance model. Higher is more relevant; one score per candidate, same order.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError>;
}

pub async fn rerank(
    scorer: &dyn RelevanceScorer,
    query: &str,
    candidates: Vec<BulletRecord>,
    top_k: usize,
) -> Result<Vec<BulletRecord>, RetrievalError> {
    if candidates.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let scores = scorer.score(query, &texts).await?;
    if scores.len() != candidates.len() {
        return Err(RetrievalError::MalformedOutput(format!(
            "cross-encoder returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        )));
    }

    let mut ranked: Vec<(BulletRecord, f32)> = candidates.into_iter().zip(scores).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_k);

    debug!("Re-ranked shortlist down to {}", ranked.len());
    Ok(ranked.into_iter().map(|(b, _)| b).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP backend (text-embeddings-inference `/rerank`)
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpCrossEncoder {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl HttpCrossEncoder {
    pub fn new(base_url: &str) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RetrievalError::RerankerUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/rerank", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl RelevanceScorer for HttpCrossEncoder {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RerankRequest {
                query,
                texts: candidates,
                raw_scores: false,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::RerankerUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::RerankerUnavailable(format!(
                "{status}: {body}"
            )));
        }

        let hits: Vec<RerankHit> = response
            .json()
            .await
            .map_err(|e| RetrievalError::MalformedOutput(format!("rerank: {e}")))?;

        scores_by_index(hits, candidates.len())
    }
}

/// Puts `(index, score)` hits back into candidate order; every index exactly once.
fn scores_by_index(hits: Vec<RerankHit>, expected: usize) -> Result<Vec<f32>, RetrievalError> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for hit in hits {
        match scores.get_mut(hit.index) {
            Some(slot) if slot.is_none() => *slot = Some(hit.score),
            _ => {
                return Err(RetrievalError::MalformedOutput(format!(
                    "rerank hit index {} out of range or repeated",
                    hit.index
                )))
            }
        }
    }
    scores
        .into_iter()
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| RetrievalError::MalformedOutput("rerank response missing candidates".into()))
}

// ────────────────────────────────────────────────────────────────────────────
// Local ONNX backend
// ────────────────────────────────────────────────────────────────────────────

/// BAAI/bge-reranker-base through fastembed. Downloads ~300 MB on first use.
/// Inference runs on the blocking pool.
#[cfg(feature = "local-models")]
pub struct FastEmbedReranker {
    model: std::sync::Arc<std::sync::Mutex<fastembed::TextRerank>>,
}

#[cfg(feature = "local-models")]
impl FastEmbedReranker {
    pub fn try_new() -> Result<Self, RetrievalError> {
        use fastembed::{RerankInitOptions, TextRerank};

        let options = RerankInitOptions::default().with_show_download_progress(true);
        let model = TextRerank::try_new(options)
            .map_err(|e| RetrievalError::RerankerUnavailable(e.to_string()))?;
        Ok(Self {
            model: std::sync::Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-models")]
#[async_trait]
impl RelevanceScorer for FastEmbedReranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError> {
        let model = self.model.clone();
        let query = query.to_string();
        let docs = candidates.to_vec();
        let results = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| RetrievalError::RerankerUnavailable("model lock poisoned".into()))?;
            let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
            model
                .rerank(query.as_str(), docs, false, None)
                .map_err(|e| RetrievalError::RerankerUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| RetrievalError::RerankerUnavailable(format!("rerank task failed: {e}")))??;
        let hits = results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                score: r.score,
            })
            .collect();
        scores_by_index(hits, candidates.len())
    }
}
