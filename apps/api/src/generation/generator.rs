//! Package generation: orchestrates résumé + cover letter assembly from a confirmed
//! bullet selection.
//!
//! Flow: clean JD → resolve selection against the live snapshot → embed JD for
//!       per-item ranking → narrative collaborator → enforce selection →
//!       assemble sections → render mirrors.
//!
//! Every fatal failure (embedder, narrative service unreachable) happens before the
//! renderer is called, so a failed request never leaves files behind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::generation::assembly::{assemble_resume, ResumeDraft};
use crate::generation::enforcer::{enforce_selection, hint_is_usable, SelectionPolicy};
use crate::generation::jd_parser::clean_jd_text;
use crate::generation::narrative::{
    AllowedBullet, CoverLetter, NarrativeError, NarrativeGenerator, NarrativeRequest,
};
use crate::generation::tone::ToneGuide;
use crate::render::{DocumentRenderer, RenderRequest, RenderedFiles};
use crate::retrieval::hybrid::QueryRanker;
use crate::retrieval::index::{BulletRecord, CorpusIndex};
use crate::retrieval::service::RetrievalService;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for package generation.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRequest {
    pub jd_text: String,
    #[serde(default)]
    pub selected_bullet_ids: Vec<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageResponse {
    pub resume: ResumeDraft,
    pub cover_letter: CoverLetter,
    pub files: RenderedFiles,
    /// Recoverable degradations: dropped IDs, ignored hint, fallback narrative.
    pub warnings: Vec<String>,
}

/// What survives of the narrative reply after failure handling.
struct NarrativeOutcome {
    headline: Option<String>,
    hint: Option<Vec<String>>,
    cover_letter: CoverLetter,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_package(
    retrieval: &RetrievalService,
    narrative: &dyn NarrativeGenerator,
    tone: &ToneGuide,
    renderer: &dyn DocumentRenderer,
    policy: &SelectionPolicy,
    request: PackageRequest,
) -> Result<PackageResponse, AppError> {
    let jd_text = clean_jd_text(&request.jd_text);
    if jd_text.is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    if request.selected_bullet_ids.is_empty() {
        return Err(AppError::Validation(
            "selected_bullet_ids cannot be empty".to_string(),
        ));
    }

    let mut warnings = Vec::new();

    // Step 1: Resolve the selection against one snapshot for the whole request
    let snapshot = retrieval.snapshot().await;
    let (selection, unknown) = resolve_selection(&snapshot.index, &request.selected_bullet_ids);
    if !unknown.is_empty() {
        warn!("Dropping {} unknown bullet id(s): {:?}", unknown.len(), unknown);
        warnings.push(format!(
            "Ignored unknown bullet ids: {}",
            unknown.join(", ")
        ));
    }
    if selection.is_empty() {
        return Err(AppError::Validation(
            "None of the selected bullet ids exist in the corpus".to_string(),
        ));
    }

    // Step 2: Embed the JD once for per-item relevance ranking
    let ranker = QueryRanker::new(&snapshot.index, retrieval.embedder(), &jd_text).await?;

    // Step 3: Narrative collaborator sees only the resolved selection
    let allowed: Vec<AllowedBullet> = selection.iter().map(AllowedBullet::from).collect();
    let outcome = compose_narrative(
        narrative,
        &NarrativeRequest {
            job_description: &jd_text,
            allowed: &allowed,
            tone,
        },
        &snapshot.document.profile.full_name,
        &mut warnings,
    )
    .await?;

    // Step 4: Ordering hint is advisory only
    let hint = outcome
        .hint
        .filter(|h| {
            let usable = hint_is_usable(h, &selection);
            if !usable && !h.is_empty() {
                warn!("Narrative ordering hint references unselected bullets; ignoring it");
                warnings.push(
                    "Suggested bullet order referenced unselected bullets; kept your order"
                        .to_string(),
                );
            }
            usable
        });

    // Step 5: Enforce inclusion policy and assemble sections
    let groups = enforce_selection(&selection, hint.as_deref(), &ranker, policy);
    let resume = assemble_resume(&snapshot.document, groups, outcome.headline);
    info!(
        "Assembled résumé: {} sections, {} bullets from {} selected",
        resume.sections.len(),
        resume.bullets().count(),
        selection.len()
    );

    // Step 6: Render only after every fatal check has passed
    let files = renderer
        .render(&RenderRequest {
            profile: &snapshot.document.profile,
            resume: &resume,
            cover_letter: &outcome.cover_letter,
            company: request.company.as_deref(),
            role: request.role.as_deref(),
        })
        .await?;

    Ok(PackageResponse {
        resume,
        cover_letter: outcome.cover_letter,
        files,
        warnings,
    })
}

/// Known records in request order, deduplicated, plus the IDs that matched nothing.
fn resolve_selection(index: &CorpusIndex, ids: &[String]) -> (Vec<BulletRecord>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut known = Vec::new();
    let mut unknown = Vec::new();

    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match index.bullet(id) {
            Some(record) => known.push(record.clone()),
            None => unknown.push(id.clone()),
        }
    }
    (known, unknown)
}

async fn compose_narrative(
    narrative: &dyn NarrativeGenerator,
    request: &NarrativeRequest<'_>,
    full_name: &str,
    warnings: &mut Vec<String>,
) -> Result<NarrativeOutcome, AppError> {
    match narrative.compose(request).await {
        Ok(package) => {
            let hint = package.ordering_hint();
            debug!("Narrative hint has {} bullet id(s)", hint.len());
            let mut cover_letter = package.cover_letter;
            if cover_letter.signature.trim().is_empty() {
                cover_letter.signature = full_name.to_string();
            }
            Ok(NarrativeOutcome {
                headline: Some(package.resume.headline),
                hint: Some(hint),
                cover_letter,
            })
        }
        Err(NarrativeError::Malformed(reason)) => {
            warn!("Narrative output malformed, using fallbacks: {reason}");
            warnings.push(
                "Narrative output was malformed; used selection order and a minimal cover letter"
                    .to_string(),
            );
            Ok(NarrativeOutcome {
                headline: None,
                hint: None,
                cover_letter: CoverLetter::fallback(full_name),
            })
        }
        Err(NarrativeError::Unavailable(reason)) => Err(AppError::Llm(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::json;

    use crate::render::PlainTextRenderer;
    use crate::retrieval::testing::{sample_corpus, KeywordEmbedder, OverlapScorer, ScriptedNarrative};
    use crate::retrieval::RetrievalParams;

    const JD: &str = "Senior Product Manager. Responsibilities: pricing, analytics, Kafka.";

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

    fn reply(hint: &[&str]) -> ScriptedNarrative {
        ScriptedNarrative::Reply(json!({
            "resume": {
                "headline": "Product manager who turns data platforms into revenue",
                "sections": [{"title": "Experience", "items": [{"bullet_ids": hint}]}]
            },
            "cover_letter": {
                "greeting": "Dear Initech team",
                "body_paragraphs": ["At Acme I launched usage-based pricing."],
                "closing": "Best,",
                "signature": ""
            }
        }))
    }

    fn request(ids: &[&str]) -> PackageRequest {
        PackageRequest {
            jd_text: JD.to_string(),
            selected_bullet_ids: ids.iter().map(|s| s.to_string()).collect(),
            company: Some("Initech".to_string()),
            role: Some("Senior PM".to_string()),
        }
    }

    async fn run(
        narrative: &ScriptedNarrative,
        out: &Path,
        req: PackageRequest,
    ) -> Result<PackageResponse, AppError> {
        let retrieval = service().await;
        let renderer = PlainTextRenderer::new(out);
        generate_package(
            &retrieval,
            narrative,
            &ToneGuide::default(),
            &renderer,
            &SelectionPolicy::default(),
            req,
        )
        .await
    }

    #[tokio::test]
    async fn test_full_package_enforces_and_orders_sections() {
        let dir = tempfile::tempdir().unwrap();
        let narrative = reply(&["crawler-1", "acme-3"]);

        let response = run(&narrative, dir.path(), request(&["acme-3", "crawler-1", "nope-9"]))
            .await
            .unwrap();

        let titles: Vec<&str> = response.resume.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Education", "Experience", "Projects"]);

        let acme = &response.resume.sections[1].items[0];
        assert_eq!(acme.employer, "Acme");
        assert_eq!(acme.bullets.len(), 3);
        assert!(acme.bullets.contains(&"Launched usage-based pricing that grew revenue 18%".to_string()));
        assert!(acme.bullets.contains(&"Led roadmap planning across three product squads".to_string()));
        assert_eq!(acme.bullets[2], "Ran customer discovery interviews with 40 enterprise buyers");

        let crawler = &response.resume.sections[2].items[0];
        assert_eq!(crawler.role, "Crawler");
        assert_eq!(crawler.bullets.len(), 2);

        assert_eq!(
            response.resume.headline.as_deref(),
            Some("Product manager who turns data platforms into revenue")
        );
        assert_eq!(response.cover_letter.signature, "Dana Reyes");
        assert_eq!(response.warnings.len(), 1);
        assert!(response.warnings[0].contains("nope-9"));
        assert!(response.files.resume_path.exists());
        assert!(response
            .files
            .resume_path
            .ends_with("Dana_Reyes_Resume_Initech_Senior_PM.txt"));
    }

    #[tokio::test]
    async fn test_malformed_narrative_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let response = run(&ScriptedNarrative::Malformed, dir.path(), request(&["globex-1"]))
            .await
            .unwrap();

        assert!(response.resume.headline.is_none());
        assert_eq!(response.cover_letter, CoverLetter::fallback("Dana Reyes"));
        assert!(response.warnings.iter().any(|w| w.contains("malformed")));
        assert_eq!(response.resume.sections[1].items[0].bullets.len(), 2);
        assert!(response.files.cover_letter_path.exists());
    }

    #[tokio::test]
    async fn test_unavailable_narrative_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let result = run(&ScriptedNarrative::Unavailable, &out, request(&["acme-1"])).await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_hint_outside_selection_is_ignored_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let narrative = reply(&["globex-2", "acme-3"]);
        let response = run(&narrative, dir.path(), request(&["acme-3", "globex-1"]))
            .await
            .unwrap();

        assert!(response.warnings.iter().any(|w| w.contains("kept your order")));
        let experience = &response.resume.sections[1];
        assert_eq!(experience.items[0].employer, "Acme");
        assert_eq!(experience.items[1].employer, "Globex");
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let dir = tempfile::tempdir().unwrap();
        let narrative = reply(&[]);

        let mut blank_jd = request(&["acme-1"]);
        blank_jd.jd_text = " \n ".to_string();
        assert!(matches!(
            run(&narrative, dir.path(), blank_jd).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            run(&narrative, dir.path(), request(&[])).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            run(&narrative, dir.path(), request(&["ghost-1", "ghost-2"])).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_ids_resolve_once() {
        let retrieval = service().await;
        let snapshot = retrieval.snapshot().await;
        let ids: Vec<String> = ["acme-1", "acme-1", "x", "x"].iter().map(|s| s.to_string()).collect();

        let (known, unknown) = resolve_selection(&snapshot.index, &ids);
        assert_eq!(known.len(), 1);
        assert_eq!(unknown, vec!["x"]);
    }
}
