//! Embedding collaborator: texts in, unit-normalized fixed-dimension vectors out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::retrieval::RetrievalError;

const MAX_RETRIES: u32 = 3;
const BATCH_SIZE: usize = 64;

/// Must be deterministic for identical input and model configuration.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

/// Scales `v` to unit length. A zero vector is returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP backend
// ────────────────────────────────────────────────────────────────────────────

/// Talks to any server exposing `POST {base}/embeddings` in the OpenAI shape
/// (OpenAI itself, text-embeddings-inference, vLLM, Ollama's compat layer).
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            api_key,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let mut last_error = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.post(&self.endpoint).json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = format!("{status}: {}", response.text().await.unwrap_or_default());
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RetrievalError::EmbeddingUnavailable(format!(
                    "{status}: {body}"
                )));
            }

            let parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| RetrievalError::MalformedOutput(format!("embeddings: {e}")))?;

            return vectors_by_index(parsed.data, inputs.len());
        }

        Err(RetrievalError::EmbeddingUnavailable(format!(
            "gave up after {MAX_RETRIES} attempts: {last_error}"
        )))
    }
}

/// Puts vectors back into input order; every index in `0..expected` exactly once.
fn vectors_by_index(
    data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    if data.len() != expected {
        return Err(RetrievalError::MalformedOutput(format!(
            "embedding server returned {} vectors for {expected} inputs",
            data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        match slots.get_mut(item.index) {
            Some(slot) if slot.is_none() => *slot = Some(l2_normalize(item.embedding)),
            _ => {
                return Err(RetrievalError::MalformedOutput(format!(
                    "embedding index {} out of range or repeated",
                    item.index
                )))
            }
        }
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| RetrievalError::MalformedOutput("embedding response missing inputs".into()))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        debug!("Embedded {} texts via {}", texts.len(), self.endpoint);
        Ok(vectors)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local ONNX backend
// ────────────────────────────────────────────────────────────────────────────

/// all-MiniLM-L6-v2 run locally through fastembed. Downloads the model on first use.
/// Inference runs on the blocking pool.
#[cfg(feature = "local-models")]
pub struct FastEmbedder {
    model: std::sync::Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-models")]
impl FastEmbedder {
    pub fn try_new() -> Result<Self, RetrievalError> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;
        Ok(Self {
            model: std::sync::Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-models")]
#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.clone();
        let texts = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| RetrievalError::EmbeddingUnavailable("model lock poisoned".into()))?;
            model
                .embed(texts, None)
                .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| RetrievalError::EmbeddingUnavailable(format!("embedding task failed: {e}")))??;
        Ok(vectors.into_iter().map(l2_normalize).collect())
    }
}
