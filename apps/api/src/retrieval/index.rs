//! Corpus Indexer: flattens the résumé document into bullet records and builds the
//! lexical and semantic indices side by side.
//!
//! An index is built in one call and never mutated. Reloading the corpus means building
//! a new index; see `retrieval::service` for how it is published.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::models::{non_blank, CorpusDocument, DateRange};
use crate::retrieval::embedder::Embedder;
use crate::retrieval::lexical::LexicalIndex;
use crate::retrieval::text::{normalize, tokenize};
use crate::retrieval::RetrievalError;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletMetadata {
    pub section_id: Option<String>,
    pub section_title: Option<String>,
    pub item_id: Option<String>,
    pub employer: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub dates: DateRange,
    pub skills: Vec<String>,
    pub domains: Vec<String>,
    pub primary: bool,
}

/// One verbatim bullet with a back-reference to its section and item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletRecord {
    pub id: String,
    /// Normalized text, rendered as-is downstream.
    pub text: String,
    pub metadata: BulletMetadata,
}

/// A bullet paired with its score for one query. Never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub bullet: BulletRecord,
    pub score: f64,
}

pub struct CorpusIndex {
    bullets: Vec<BulletRecord>,
    lexical: LexicalIndex,
    /// One unit vector per bullet, parallel to `bullets`.
    vectors: Vec<Vec<f32>>,
    dimension: usize,
    /// Bullet positions grouped by `item_id` ("" when the item has none).
    item_to_indices: HashMap<String, Vec<usize>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Build
// ────────────────────────────────────────────────────────────────────────────

/// Flattens sections → items → bullets, skipping bullets whose text normalizes to empty.
pub fn flatten_corpus(doc: &CorpusDocument) -> Vec<BulletRecord> {
    let mut records = Vec::new();

    for section in &doc.sections {
        for item in &section.items {
            for bullet in &item.bullets {
                let text = normalize(&bullet.text);
                if text.is_empty() {
                    continue;
                }
                records.push(BulletRecord {
                    id: bullet.id.clone(),
                    text,
                    metadata: BulletMetadata {
                        section_id: Some(section.id.clone()),
                        section_title: owned(&section.title),
                        item_id: owned(&item.id),
                        employer: item.employer_or_name().map(str::to_string),
                        role: owned(&item.role),
                        location: owned(&item.location),
                        dates: item.dates.clone(),
                        skills: dedup_preserving_order(&bullet.skills),
                        domains: dedup_preserving_order(&bullet.domains),
                        primary: bullet.primary,
                    },
                });
            }
        }
    }

    records
}

fn owned(value: &Option<String>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

fn dedup_preserving_order(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

impl CorpusIndex {
    /// Builds both indices. Fails as a whole if the embedder fails: hybrid scoring
    /// needs both halves, so there is no partial index.
    pub async fn build(
        doc: &CorpusDocument,
        embedder: &dyn Embedder,
    ) -> Result<Self, RetrievalError> {
        let bullets = flatten_corpus(doc);

        let mut item_to_indices: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, bullet) in bullets.iter().enumerate() {
            let key = bullet.metadata.item_id.clone().unwrap_or_default();
            item_to_indices.entry(key).or_default().push(idx);
        }

        let tokenized: Vec<Vec<String>> = bullets.iter().map(|b| tokenize(&b.text)).collect();
        let lexical = LexicalIndex::build(&tokenized);

        let texts: Vec<String> = bullets.iter().map(|b| b.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&texts).await?
        };

        if vectors.len() != bullets.len() {
            return Err(RetrievalError::MalformedOutput(format!(
                "embedder returned {} vectors for {} bullets",
                vectors.len(),
                bullets.len()
            )));
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RetrievalError::MalformedOutput(format!(
                "embedding dimension mismatch: expected {dimension}, got {}",
                bad.len()
            )));
        }

        info!(
            "Built corpus index: {} bullets across {} items, embedding dim {}",
            bullets.len(),
            item_to_indices.len(),
            dimension
        );

        Ok(Self {
            bullets,
            lexical,
            vectors,
            dimension,
            item_to_indices,
        })
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.item_to_indices.len()
    }

    pub fn bullets(&self) -> &[BulletRecord] {
        &self.bullets
    }

    pub fn bullet(&self, id: &str) -> Option<&BulletRecord> {
        self.bullets.iter().find(|b| b.id == id)
    }

    pub(crate) fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub(crate) fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub(crate) fn dimension(&self) -> usize {
        self.dimension
    }

    pub(crate) fn item_indices(&self, item_id: &str) -> &[usize] {
        self.item_to_indices
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::testing::{sample_corpus, FailingEmbedder, KeywordEmbedder};

    #[test]
    fn test_flatten_skips_blank_bullets() {
        let doc = sample_corpus();
        let source_count: usize = doc
            .sections
            .iter()
            .flat_map(|s| &s.items)
            .map(|i| i.bullets.len())
            .sum();
        let records = flatten_corpus(&doc);
        assert!(records.len() < source_count);
        assert!(records.iter().all(|r| !r.text.is_empty()));
        assert!(records.iter().all(|r| r.id != "acme-blank"));
    }

    #[test]
    fn test_flatten_carries_item_metadata() {
        let records = flatten_corpus(&sample_corpus());
        let b1 = records.iter().find(|r| r.id == "acme-1").unwrap();
        assert_eq!(b1.metadata.item_id.as_deref(), Some("acme-pm"));
        assert_eq!(b1.metadata.employer.as_deref(), Some("Acme"));
        assert_eq!(b1.metadata.section_title.as_deref(), Some("Experience"));
        assert!(b1.metadata.primary);

        let proj = records.iter().find(|r| r.id == "crawler-1").unwrap();
        assert_eq!(proj.metadata.employer.as_deref(), Some("Crawler"));
    }

    #[test]
    fn test_flatten_treats_blank_metadata_as_missing() {
        let doc: CorpusDocument = serde_json::from_str(
            r#"{"sections": [{"id": "projects", "title": " ", "items": [
                {"id": "", "employer": "", "name": "Crawler", "role": "", "location": "",
                 "bullets": [{"id": "c1", "text": "Wrote a crawler"}]}
            ]}]}"#,
        )
        .unwrap();
        let meta = &flatten_corpus(&doc)[0].metadata;
        assert_eq!(meta.employer.as_deref(), Some("Crawler"));
        assert_eq!(meta.section_title, None);
        assert_eq!(meta.item_id, None);
        assert_eq!(meta.role, None);
        assert_eq!(meta.location, None);
    }

    #[test]
    fn test_flatten_normalizes_text() {
        let records = flatten_corpus(&sample_corpus());
        let b = records.iter().find(|r| r.id == "acme-3").unwrap();
        assert!(!b.text.contains("  "));
        assert!(!b.text.contains('\u{00A0}'));
    }

    #[tokio::test]
    async fn test_build_groups_bullets_by_item() {
        let index = CorpusIndex::build(&sample_corpus(), &KeywordEmbedder::default())
            .await
            .unwrap();
        let acme: Vec<&str> = index
            .item_indices("acme-pm")
            .iter()
            .map(|&i| index.bullets()[i].id.as_str())
            .collect();
        assert_eq!(acme, vec!["acme-1", "acme-2", "acme-3", "acme-4"]);
        assert!(index.item_indices("nope").is_empty());
        assert_eq!(index.vectors().len(), index.len());
    }

    #[tokio::test]
    async fn test_build_empty_corpus_is_ok() {
        let index = CorpusIndex::build(&CorpusDocument::default(), &FailingEmbedder)
            .await
            .unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 0);
    }

    #[tokio::test]
    async fn test_build_fails_when_embedder_unavailable() {
        let result = CorpusIndex::build(&sample_corpus(), &FailingEmbedder).await;
        assert!(matches!(
            result,
            Err(RetrievalError::EmbeddingUnavailable(_))
        ));
    }
}
