//! Hybrid Scorer: weighted blend of min-max normalized BM25 and cosine similarity.

use tracing::debug;

use crate::retrieval::embedder::{dot, Embedder};
use crate::retrieval::index::{BulletRecord, CorpusIndex, ScoredCandidate};
use crate::retrieval::text::{extract_keywords, normalize};
use crate::retrieval::RetrievalError;

/// Added to the min-max denominator so a constant score array maps to 0, not NaN.
const NORM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    /// Weight of the semantic term; the lexical term gets `1 - semantic`.
    pub semantic: f64,
    /// Max keywords pulled from the query for BM25.
    pub keyword_limit: usize,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            semantic: 0.6,
            keyword_limit: 128,
        }
    }
}

pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    scores
        .iter()
        .map(|s| (s - min) / (range + NORM_EPSILON))
        .collect()
}

/// Embeds a single query and checks it lives in the index's vector space.
pub async fn embed_query(
    embedder: &dyn Embedder,
    query: &str,
    dimension: usize,
) -> Result<Vec<f32>, RetrievalError> {
    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let vector = vectors.pop().ok_or_else(|| {
        RetrievalError::MalformedOutput("embedder returned no vector for the query".to_string())
    })?;
    if vector.len() != dimension {
        return Err(RetrievalError::MalformedOutput(format!(
            "query embedding has dimension {}, index has {dimension}",
            vector.len()
        )));
    }
    Ok(vector)
}

/// Scores every indexed bullet for `query_text` and returns the best `top_k`,
/// descending. Equal scores keep corpus order.
pub async fn search(
    index: &CorpusIndex,
    embedder: &dyn Embedder,
    query_text: &str,
    top_k: usize,
    weights: &HybridWeights,
) -> Result<Vec<ScoredCandidate>, RetrievalError> {
    if index.is_empty() || top_k == 0 || normalize(query_text).is_empty() {
        return Ok(Vec::new());
    }

    let keywords = extract_keywords(query_text, weights.keyword_limit);
    let lexical = index.lexical().scores(&keywords);

    let query_vector = embed_query(embedder, query_text, index.dimension()).await?;
    let semantic: Vec<f64> = index
        .vectors()
        .iter()
        .map(|v| dot(v, &query_vector) as f64)
        .collect();

    let lexical = min_max_normalize(&lexical);
    let semantic = min_max_normalize(&semantic);

    let mut scored: Vec<(usize, f64)> = semantic
        .iter()
        .zip(&lexical)
        .map(|(s, l)| weights.semantic * s + (1.0 - weights.semantic) * l)
        .enumerate()
        .collect();

    // Stable: ties stay in corpus order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    debug!(
        "Hybrid search: {} keywords, {} candidates returned",
        keywords.len(),
        scored.len()
    );

    Ok(scored
        .into_iter()
        .map(|(i, score)| ScoredCandidate {
            bullet: index.bullets()[i].clone(),
            score,
        })
        .collect())
}

/// Ranks bullets within one item by relevance to an already-embedded query.
pub trait ItemRanking {
    /// Every bullet of `item_id`, most relevant first. Empty for unknown items.
    fn rank_item_bullets(&self, item_id: &str) -> Vec<BulletRecord>;
}

/// Raw cosine ranking within an item; no lexical term, no normalization.
pub struct QueryRanker<'a> {
    index: &'a CorpusIndex,
    query_vector: Vec<f32>,
}

impl<'a> QueryRanker<'a> {
    pub async fn new(
        index: &'a CorpusIndex,
        embedder: &dyn Embedder,
        query_text: &str,
    ) -> Result<QueryRanker<'a>, RetrievalError> {
        let query_vector = if index.is_empty() {
            Vec::new()
        } else {
            embed_query(embedder, query_text, index.dimension()).await?
        };
        Ok(Self {
            index,
            query_vector,
        })
    }
}

impl ItemRanking for QueryRanker<'_> {
    fn rank_item_bullets(&self, item_id: &str) -> Vec<BulletRecord> {
        let mut subset: Vec<(usize, f32)> = self
            .index
            .item_indices(item_id)
            .iter()
            .map(|&i| (i, dot(&self.index.vectors()[i], &self.query_vector)))
            .collect();
        subset.sort_by(|a, b| b.1.total_cmp(&a.1));
        subset
            .into_iter()
            .map(|(i, _)| self.index.bullets()[i].clone())
            .collect()
    }
}

/// One-shot form of `QueryRanker`. Skips embedding when the item has no bullets.
pub async fn rank_item_bullets(
    index: &CorpusIndex,
    embedder: &dyn Embedder,
    item_id: &str,
    query_text: &str,
) -> Result<Vec<BulletRecord>, RetrievalError> {
    if index.item_indices(item_id).is_empty() {
        return Ok(Vec::new());
    }
    let ranker = QueryRanker::new(index, embedder, query_text).await?;
    Ok(ranker.rank_item_bullets(item_id))
}
