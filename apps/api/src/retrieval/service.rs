//! Owns the live corpus snapshot and the retrieval collaborators.
//!
//! Snapshots are immutable. `reload` builds a complete replacement without holding the
//! lock and swaps the `Arc` only once it is ready, so readers see either the old index or
//! the new one, never a half-built one. A failed rebuild leaves the old snapshot live.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::corpus::models::CorpusDocument;
use crate::retrieval::diversify::diversify;
use crate::retrieval::embedder::Embedder;
use crate::retrieval::hybrid::{rank_item_bullets, search};
use crate::retrieval::index::{BulletRecord, CorpusIndex, ScoredCandidate};
use crate::retrieval::reranker::{rerank, RelevanceScorer};
use crate::retrieval::text::normalize;
use crate::retrieval::{RetrievalError, RetrievalParams};

/// The corpus document and the index built from it, published together.
pub struct CorpusSnapshot {
    pub document: CorpusDocument,
    pub index: CorpusIndex,
}

pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    scorer: Arc<dyn RelevanceScorer>,
    params: RetrievalParams,
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl RetrievalService {
    pub async fn build(
        document: CorpusDocument,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn RelevanceScorer>,
        params: RetrievalParams,
    ) -> Result<Self, RetrievalError> {
        let index = CorpusIndex::build(&document, embedder.as_ref()).await?;
        Ok(Self {
            embedder,
            scorer,
            params,
            current: RwLock::new(Arc::new(CorpusSnapshot { document, index })),
        })
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub async fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current.read().await.clone()
    }

    /// Rebuilds from `document` and publishes the result.
    pub async fn reload(
        &self,
        document: CorpusDocument,
    ) -> Result<Arc<CorpusSnapshot>, RetrievalError> {
        let index = CorpusIndex::build(&document, self.embedder.as_ref()).await?;
        let fresh = Arc::new(CorpusSnapshot { document, index });
        *self.current.write().await = fresh.clone();
        info!(
            "Published new corpus snapshot: {} bullets",
            fresh.index.len()
        );
        Ok(fresh)
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let snapshot = self.snapshot().await;
        search(
            &snapshot.index,
            self.embedder.as_ref(),
            query,
            top_k,
            &self.params.weights,
        )
        .await
    }

    pub async fn rank_item_bullets(
        &self,
        item_id: &str,
        query: &str,
    ) -> Result<Vec<BulletRecord>, RetrievalError> {
        let snapshot = self.snapshot().await;
        rank_item_bullets(&snapshot.index, self.embedder.as_ref(), item_id, query).await
    }

    /// search → diversify → cross-encoder rerank. Only the search reads the snapshot.
    pub async fn shortlist(&self, query: &str) -> Result<Vec<BulletRecord>, RetrievalError> {
        if normalize(query).is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.search(query, self.params.search_top_k).await?;
        let diversified = diversify(&hits, self.params.shortlist_size, &self.params.diversity);
        debug!(
            "Shortlist: {} hits, {} after diversification",
            hits.len(),
            diversified.len()
        );

        rerank(
            self.scorer.as_ref(),
            query,
            diversified,
            self.params.rerank_top_k,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::retrieval::testing::{
        sample_corpus, FailingScorer, KeywordEmbedder, OverlapScorer,
    };

    /// Delegates to `KeywordEmbedder` until switched off.
    struct SwitchableEmbedder {
        up: AtomicBool,
        inner: KeywordEmbedder,
    }

    #[async_trait]
    impl Embedder for SwitchableEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            if self.up.load(Ordering::SeqCst) {
                self.inner.embed(texts).await
            } else {
                Err(RetrievalError::EmbeddingUnavailable("down".to_string()))
            }
        }
    }

    async fn service() -> RetrievalService {
        RetrievalService::build(
            sample_corpus(),
            Arc::new(KeywordEmbedder::default()),
            Arc::new(OverlapScorer),
            RetrievalParams::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_shortlist_runs_full_pipeline() {
        let svc = service().await;
        let shortlist = svc
            .shortlist("Rust engineer for Postgres full-text search and Kafka pipelines")
            .await
            .unwrap();
        assert!(!shortlist.is_empty());
        assert!(shortlist.len() <= RetrievalParams::default().rerank_top_k);
        assert_eq!(shortlist[0].id, "crawler-2");
    }

    #[tokio::test]
    async fn test_search_uses_live_snapshot() {
        let svc = service().await;
        let hits = svc.search("Kafka streaming pipelines", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].bullet.id, "globex-1");

        let mut smaller = sample_corpus();
        smaller.sections.truncate(1);
        svc.reload(smaller).await.unwrap();
        let hits = svc.search("Kafka streaming pipelines", 20).await.unwrap();
        assert_eq!(hits.len(), 6);
    }

    #[tokio::test]
    async fn test_shortlist_blank_query_is_empty() {
        let svc = service().await;
        assert!(svc.shortlist("  \n ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shortlist_fails_when_reranker_down() {
        let svc = RetrievalService::build(
            sample_corpus(),
            Arc::new(KeywordEmbedder::default()),
            Arc::new(FailingScorer),
            RetrievalParams::default(),
        )
        .await
        .unwrap();
        let err = svc.shortlist("kafka").await.unwrap_err();
        assert!(matches!(err, RetrievalError::RerankerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_reload_publishes_new_snapshot() {
        let svc = service().await;
        let before = svc.snapshot().await;

        let mut smaller = sample_corpus();
        smaller.sections.truncate(1);
        svc.reload(smaller).await.unwrap();

        let after = svc.snapshot().await;
        assert_eq!(after.index.len(), 6);
        // Readers holding the old snapshot keep a consistent view.
        assert_eq!(before.index.len(), 8);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let embedder = Arc::new(SwitchableEmbedder {
            up: AtomicBool::new(true),
            inner: KeywordEmbedder::default(),
        });
        let svc = RetrievalService::build(
            sample_corpus(),
            embedder.clone(),
            Arc::new(OverlapScorer),
            RetrievalParams::default(),
        )
        .await
        .unwrap();

        embedder.up.store(false, Ordering::SeqCst);
        let mut smaller = sample_corpus();
        smaller.sections.truncate(1);
        assert!(svc.reload(smaller).await.is_err());

        assert_eq!(svc.snapshot().await.index.len(), 8);
    }

    #[tokio::test]
    async fn test_build_fails_without_embedder() {
        let result = RetrievalService::build(
            sample_corpus(),
            Arc::new(SwitchableEmbedder {
                up: AtomicBool::new(false),
                inner: KeywordEmbedder::default(),
            }),
            Arc::new(OverlapScorer),
            RetrievalParams::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
