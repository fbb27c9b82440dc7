use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::generation::enforcer::SelectionPolicy;
use crate::retrieval::diversify::DiversityLimits;
use crate::retrieval::hybrid::HybridWeights;
use crate::retrieval::RetrievalParams;

/// Which implementation backs the embedding or cross-encoder collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote inference server over HTTP.
    Http,
    /// In-process ONNX model; needs the `local-models` feature.
    FastEmbed,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "fastembed" => Ok(BackendKind::FastEmbed),
            other => Err(format!("unknown backend '{other}' (expected http or fastembed)")),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or a tunable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub corpus_path: PathBuf,
    pub tone_examples_path: PathBuf,
    pub output_dir: PathBuf,
    pub embedding_backend: BackendKind,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub reranker_backend: BackendKind,
    pub reranker_url: String,
    pub cross_encoder_model: String,
    pub retrieval: RetrievalParams,
    pub selection: SelectionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let semantic: f64 = env.parse_or("HYBRID_SEMANTIC_WEIGHT", 0.6)?;
        if !(0.0..=1.0).contains(&semantic) {
            bail!("HYBRID_SEMANTIC_WEIGHT must be between 0 and 1, got {semantic}");
        }

        Ok(Config {
            anthropic_api_key: env.require("ANTHROPIC_API_KEY")?,
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.or("RUST_LOG", "info"),
            corpus_path: env.or("CORPUS_PATH", "data/master_resume.json").into(),
            tone_examples_path: env
                .or("TONE_EXAMPLES_PATH", "data/tone_examples.json")
                .into(),
            output_dir: env.or("OUTPUT_DIR", "out").into(),
            embedding_backend: env.parse_or("EMBEDDING_BACKEND", BackendKind::Http)?,
            embedding_url: env.or("EMBEDDING_URL", "http://localhost:8081/v1"),
            embedding_model: env.or(
                "EMBEDDING_MODEL",
                "sentence-transformers/all-MiniLM-L6-v2",
            ),
            embedding_api_key: env.get("EMBEDDING_API_KEY"),
            reranker_backend: env.parse_or("RERANKER_BACKEND", BackendKind::Http)?,
            reranker_url: env.or("RERANKER_URL", "http://localhost:8082"),
            cross_encoder_model: env.or(
                "CROSS_ENCODER_MODEL",
                "cross-encoder/ms-marco-MiniLM-L-6-v2",
            ),
            retrieval: RetrievalParams {
                weights: HybridWeights {
                    semantic,
                    keyword_limit: env.parse_or("KEYWORD_LIMIT", 128)?,
                },
                diversity: DiversityLimits {
                    prefix_chars: env.parse_or("DIVERSIFY_PREFIX_CHARS", 40)?,
                    per_employer_cap: env.parse_or("DIVERSIFY_EMPLOYER_CAP", 6)?,
                },
                search_top_k: env.parse_or("SEARCH_TOP_K", 40)?,
                shortlist_size: env.parse_or("SHORTLIST_SIZE", 24)?,
                rerank_top_k: env.parse_or("RERANK_TOP_K", 16)?,
            },
            selection: SelectionPolicy {
                min_bullets_per_item: env.parse_or("MIN_BULLETS_PER_ITEM", 3)?,
            },
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Unset and blank values both count as missing.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}
