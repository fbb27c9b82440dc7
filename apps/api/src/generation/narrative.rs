//! Narrative collaborator: headline, bullet-ordering hint and cover letter.
//!
//! The reply is parsed strictly against `NarrativePackage`. Two failure kinds are kept
//! apart: `Unavailable` (no usable answer from the service) is fatal to the request,
//! `Malformed` (an answer that breaks the contract) is recovered by the caller.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::generation::prompts::{NARRATIVE_PROMPT_TEMPLATE, NARRATIVE_SYSTEM_TEMPLATE};
use crate::generation::tone::ToneGuide;
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, VERBATIM_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::retrieval::index::BulletRecord;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// What the collaborator is allowed to see of a bullet.
#[derive(Debug, Clone, Serialize)]
pub struct AllowedBullet {
    pub id: String,
    pub text: String,
    pub employer: Option<String>,
    pub role: Option<String>,
}

impl From<&BulletRecord> for AllowedBullet {
    fn from(b: &BulletRecord) -> Self {
        Self {
            id: b.id.clone(),
            text: b.text.clone(),
            employer: b.metadata.employer.clone(),
            role: b.metadata.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativePackage {
    pub resume: NarrativeResume,
    pub cover_letter: CoverLetter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeResume {
    pub headline: String,
    #[serde(default)]
    pub sections: Vec<NarrativeSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeSection {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<NarrativeItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeItem {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub bullet_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub greeting: String,
    pub body_paragraphs: Vec<String>,
    #[serde(default = "default_closing")]
    pub closing: String,
    #[serde(default)]
    pub signature: String,
}

fn default_closing() -> String {
    "Sincerely,".to_string()
}

impl CoverLetter {
    /// Minimal letter used when the collaborator's reply is malformed.
    pub fn fallback(signature: &str) -> Self {
        Self {
            greeting: "Hiring Team".to_string(),
            body_paragraphs: vec!["Thanks for considering my application.".to_string()],
            closing: default_closing(),
            signature: signature.to_string(),
        }
    }
}

impl NarrativePackage {
    /// Rejects replies that parse but leave required prose empty.
    pub fn validated(self) -> Result<Self, NarrativeError> {
        if self.resume.headline.trim().is_empty() {
            return Err(NarrativeError::Malformed("headline is empty".to_string()));
        }
        if self
            .cover_letter
            .body_paragraphs
            .iter()
            .all(|p| p.trim().is_empty())
        {
            return Err(NarrativeError::Malformed(
                "cover letter body is empty".to_string(),
            ));
        }
        Ok(self)
    }

    /// Bullet IDs in suggested order, first occurrence wins.
    pub fn ordering_hint(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.resume
            .sections
            .iter()
            .flat_map(|s| &s.items)
            .flat_map(|i| &i.bullet_ids)
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed narrative response: {0}")]
    Malformed(String),
}

pub struct NarrativeRequest<'a> {
    pub job_description: &'a str,
    pub allowed: &'a [AllowedBullet],
    pub tone: &'a ToneGuide,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait + LLM implementation
// ────────────────────────────────────────────────────────────────────────────

/// Carried in `AppState` as `Arc<dyn NarrativeGenerator>`.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn compose(
        &self,
        request: &NarrativeRequest<'_>,
    ) -> Result<NarrativePackage, NarrativeError>;
}

pub struct LlmNarrativeGenerator(pub LlmClient);

#[async_trait]
impl NarrativeGenerator for LlmNarrativeGenerator {
    async fn compose(
        &self,
        request: &NarrativeRequest<'_>,
    ) -> Result<NarrativePackage, NarrativeError> {
        let prompt = build_prompt(request);
        let system = build_system_prompt();

        let package: NarrativePackage =
            self.0.call_json(&prompt, &system).await.map_err(|e| {
                if e.is_malformed_output() {
                    NarrativeError::Malformed(e.to_string())
                } else {
                    NarrativeError::Unavailable(e.to_string())
                }
            })?;

        let package = package.validated()?;
        info!(
            "Narrative composed: {} hinted bullets, {} cover-letter paragraphs",
            package.ordering_hint().len(),
            package.cover_letter.body_paragraphs.len()
        );
        Ok(package)
    }
}

pub fn build_system_prompt() -> String {
    NARRATIVE_SYSTEM_TEMPLATE
        .replace("{verbatim_instruction}", VERBATIM_INSTRUCTION)
        .replace("{json_only_instruction}", JSON_ONLY_INSTRUCTION)
}

pub fn build_prompt(request: &NarrativeRequest<'_>) -> String {
    let allowed_bullets = request
        .allowed
        .iter()
        .map(|b| format!("- {}: {}{}", b.id, b.text, attribution(b)))
        .collect::<Vec<_>>()
        .join("\n");

    let roles: BTreeSet<String> = request
        .allowed
        .iter()
        .filter(|b| b.employer.is_some() || b.role.is_some())
        .map(|b| {
            format!(
                "{} - {}",
                b.employer.as_deref().unwrap_or(""),
                b.role.as_deref().unwrap_or("")
            )
        })
        .collect();
    let roles = roles.into_iter().collect::<Vec<_>>().join("\n");

    let tone_guide = request.tone.to_prompt_text();
    fill_template(
        NARRATIVE_PROMPT_TEMPLATE,
        &[
            ("{job_description}", request.job_description),
            ("{allowed_bullets}", &allowed_bullets),
            ("{roles}", &roles),
            ("{tone_guide}", &tone_guide),
        ],
    )
}

/// Single pass over `template`; substituted values are never scanned for placeholders.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match slots.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn attribution(b: &AllowedBullet) -> String {
    match (b.role.as_deref(), b.employer.as_deref()) {
        (Some(role), Some(employer)) => format!(" (from {role} at {employer})"),
        (Some(role), None) => format!(" (from {role})"),
        (None, Some(employer)) => format!(" (at {employer})"),
        (None, None) => String::new(),
    }
}
