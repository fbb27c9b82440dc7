// Retrieval: corpus indexing, hybrid scoring, diversification and cross-encoder
// re-ranking. Collaborators (embedder, cross-encoder) are injected as trait objects.

pub mod diversify;
pub mod embedder;
pub mod hybrid;
pub mod index;
pub mod lexical;
pub mod reranker;
pub mod service;
pub mod text;

#[cfg(test)]
pub mod testing;

use thiserror::Error;

use crate::retrieval::diversify::DiversityLimits;
use crate::retrieval::hybrid::HybridWeights;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding collaborator unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("cross-encoder unavailable: {0}")]
    RerankerUnavailable(String),

    #[error("malformed collaborator output: {0}")]
    MalformedOutput(String),
}

/// Tunables for the shortlist pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub weights: HybridWeights,
    pub diversity: DiversityLimits,
    /// Hybrid hits fed to the diversifier.
    pub search_top_k: usize,
    /// Diversified candidates fed to the cross-encoder.
    pub shortlist_size: usize,
    /// Final shortlist length.
    pub rerank_top_k: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            weights: HybridWeights::default(),
            diversity: DiversityLimits::default(),
            search_top_k: 40,
            shortlist_size: 24,
            rerank_top_k: 16,
        }
    }
}
