use std::sync::Arc;

use crate::config::Config;
use crate::generation::narrative::NarrativeGenerator;
use crate::generation::tone::ToneGuide;
use crate::render::DocumentRenderer;
use crate::retrieval::service::RetrievalService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the live corpus snapshot plus the embedder and cross-encoder.
    pub retrieval: Arc<RetrievalService>,
    /// Pluggable narrative collaborator. Default: LlmNarrativeGenerator.
    pub narrative: Arc<dyn NarrativeGenerator>,
    pub tone: Arc<ToneGuide>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub config: Config,
}
