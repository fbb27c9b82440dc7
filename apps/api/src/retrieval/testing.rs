//! Deterministic collaborators and fixtures for tests. No network.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::corpus::models::{BulletSource, CorpusDocument, DateRange, Item, Profile, Section};
use crate::generation::narrative::{
    NarrativeError, NarrativeGenerator, NarrativePackage, NarrativeRequest,
};
use crate::retrieval::embedder::{l2_normalize, Embedder};
use crate::retrieval::hybrid::ItemRanking;
use crate::retrieval::index::{flatten_corpus, BulletRecord};
use crate::retrieval::reranker::RelevanceScorer;
use crate::retrieval::RetrievalError;

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bag-of-words hashed into a small fixed dimension.
pub struct KeywordEmbedder {
    pub dimension: usize,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self { dimension: 64 }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dimension];
                for word in words(text) {
                    let mut h = DefaultHasher::new();
                    word.hash(&mut h);
                    v[(h.finish() as usize) % self.dimension] += 1.0;
                }
                l2_normalize(v)
            })
            .collect())
    }
}

/// Returns the same vector for every input, so every cosine score ties.
pub struct ConstantEmbedder;

#[async_trait]
impl Embedder for ConstantEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Err(RetrievalError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Cross-encoder stand-in: number of distinct query words present in the candidate.
pub struct OverlapScorer;

#[async_trait]
impl RelevanceScorer for OverlapScorer {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError> {
        let query_words: HashSet<String> = words(query).into_iter().collect();
        Ok(candidates
            .iter()
            .map(|c| {
                let cand: HashSet<String> = words(c).into_iter().collect();
                query_words.intersection(&cand).count() as f32
            })
            .collect())
    }
}

pub struct FailingScorer;

#[async_trait]
impl RelevanceScorer for FailingScorer {
    async fn score(&self, _query: &str, _c: &[String]) -> Result<Vec<f32>, RetrievalError> {
        Err(RetrievalError::RerankerUnavailable("model not loaded".to_string()))
    }
}

/// Item ranking with a scripted relevance order; unlisted bullets follow in corpus order.
pub struct FixedRanking {
    order: Vec<BulletRecord>,
}

impl FixedRanking {
    pub fn new(doc: &CorpusDocument, most_relevant_first: &[&str]) -> Self {
        let mut order = flatten_corpus(doc);
        order.sort_by_key(|b| {
            most_relevant_first
                .iter()
                .position(|id| *id == b.id)
                .unwrap_or(usize::MAX)
        });
        Self { order }
    }
}

impl ItemRanking for FixedRanking {
    fn rank_item_bullets(&self, item_id: &str) -> Vec<BulletRecord> {
        self.order
            .iter()
            .filter(|b| b.metadata.item_id.as_deref() == Some(item_id))
            .cloned()
            .collect()
    }
}

/// Looks a bullet record up by id in the flattened corpus.
pub fn record(doc: &CorpusDocument, id: &str) -> BulletRecord {
    flatten_corpus(doc)
        .into_iter()
        .find(|b| b.id == id)
        .unwrap_or_else(|| panic!("no bullet {id} in fixture"))
}

/// Narrative double returning a canned outcome.
pub enum ScriptedNarrative {
    Reply(serde_json::Value),
    Malformed,
    Unavailable,
}

#[async_trait]
impl NarrativeGenerator for ScriptedNarrative {
    async fn compose(
        &self,
        _request: &NarrativeRequest<'_>,
    ) -> Result<NarrativePackage, NarrativeError> {
        match self {
            ScriptedNarrative::Reply(value) => serde_json::from_value::<NarrativePackage>(
                value.clone(),
            )
            .map_err(|e| NarrativeError::Malformed(e.to_string()))?
            .validated(),
            ScriptedNarrative::Malformed => Err(NarrativeError::Malformed(
                "expected value at line 1 column 1".to_string(),
            )),
            ScriptedNarrative::Unavailable => Err(NarrativeError::Unavailable(
                "API error (status 401): invalid x-api-key".to_string(),
            )),
        }
    }
}

fn bullet(id: &str, text: &str, skills: &[&str], primary: bool) -> BulletSource {
    BulletSource {
        id: id.to_string(),
        text: text.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        domains: vec![],
        primary,
    }
}

fn dates(start: &str, end: &str) -> DateRange {
    DateRange {
        start: Some(start.to_string()),
        end: Some(end.to_string()),
    }
}

pub fn sample_corpus() -> CorpusDocument {
    CorpusDocument {
        profile: Profile {
            full_name: "Dana Reyes".to_string(),
            ..Default::default()
        },
        sections: vec![
            Section {
                id: "exp".to_string(),
                title: Some("Experience".to_string()),
                items: vec![
                    Item {
                        id: Some("acme-pm".to_string()),
                        employer: Some("Acme".to_string()),
                        role: Some("Product Manager".to_string()),
                        location: Some("Remote".to_string()),
                        dates: dates("2021", "2024"),
                        bullets: vec![
                            bullet(
                                "acme-1",
                                "Launched usage-based pricing that grew revenue 18%",
                                &["pricing", "analytics"],
                                true,
                            ),
                            bullet(
                                "acme-2",
                                "Led roadmap planning across three product squads",
                                &["roadmaps"],
                                true,
                            ),
                            bullet(
                                "acme-3",
                                "Ran  customer discovery\u{00A0}interviews with 40 enterprise buyers",
                                &["research"],
                                false,
                            ),
                            bullet(
                                "acme-4",
                                "Built Kafka dashboards tracking activation funnels",
                                &["kafka", "analytics"],
                                false,
                            ),
                            bullet("acme-blank", "   ", &[], false),
                        ],
                        ..Default::default()
                    },
                    Item {
                        id: Some("globex-de".to_string()),
                        employer: Some("Globex".to_string()),
                        role: Some("Data Engineer".to_string()),
                        dates: dates("2018", "2021"),
                        bullets: vec![
                            bullet(
                                "globex-1",
                                "Built Kafka streaming pipelines processing 2B events daily",
                                &["kafka", "rust"],
                                false,
                            ),
                            bullet(
                                "globex-2",
                                "Migrated Postgres clusters with zero downtime",
                                &["postgres"],
                                false,
                            ),
                        ],
                        ..Default::default()
                    },
                ],
            },
            Section {
                id: "projects".to_string(),
                title: Some("Projects".to_string()),
                items: vec![Item {
                    id: Some("crawler".to_string()),
                    name: Some("Crawler".to_string()),
                    bullets: vec![
                        bullet(
                            "crawler-1",
                            "Wrote a Rust web crawler with bloom-filter dedup",
                            &["rust", "tokio", "bloom filters"],
                            false,
                        ),
                        bullet(
                            "crawler-2",
                            "Indexed crawled pages into Postgres full-text search",
                            &["postgres", "rust", "search"],
                            false,
                        ),
                    ],
                    ..Default::default()
                }],
            },
            Section {
                id: "education".to_string(),
                title: Some("Education".to_string()),
                items: vec![Item {
                    institution: Some("State University".to_string()),
                    credential: Some("BSc Computer Science".to_string()),
                    location: Some("Austin, TX".to_string()),
                    dates: dates("2014", "2018"),
                    ..Default::default()
                }],
            },
        ],
    }
}
