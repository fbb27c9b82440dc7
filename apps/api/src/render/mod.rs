// Rendering: writes the final résumé and cover letter as plain-text mirrors.
// Called only once every fatal check in the package pipeline has passed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::corpus::models::Profile;
use crate::generation::assembly::ResumeDraft;
use crate::generation::narrative::CoverLetter;

pub struct RenderRequest<'a> {
    pub profile: &'a Profile,
    pub resume: &'a ResumeDraft,
    pub cover_letter: &'a CoverLetter,
    pub company: Option<&'a str>,
    pub role: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedFiles {
    pub resume_path: PathBuf,
    pub cover_letter_path: PathBuf,
    pub resume_text: String,
    pub cover_letter_text: String,
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest<'_>) -> anyhow::Result<RenderedFiles>;
}

pub struct PlainTextRenderer {
    output_dir: PathBuf,
}

impl PlainTextRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl DocumentRenderer for PlainTextRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> anyhow::Result<RenderedFiles> {
        let name = slug(Some(request.profile.full_name.as_str()), "Candidate");
        let company = slug(request.company, "Company");
        let role = slug(request.role, "Role");

        let resume_path = self
            .output_dir
            .join(format!("{name}_Resume_{company}_{role}.txt"));
        let cover_letter_path = self
            .output_dir
            .join(format!("{name}_CoverLetter_{company}_{role}.txt"));

        let resume_text = resume_mirror(&request.profile.full_name, request.resume);
        let cover_letter_text = request.cover_letter.body_paragraphs.join("\n\n");

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "failed to create output dir {}: {e}",
                    self.output_dir.display()
                )
            })?;
        tokio::fs::write(&resume_path, &resume_text)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", resume_path.display()))?;
        tokio::fs::write(&cover_letter_path, &cover_letter_text)
            .await
            .map_err(|e| {
                anyhow::anyhow!("failed to write {}: {e}", cover_letter_path.display())
            })?;

        info!(
            "Rendered {} and {}",
            resume_path.display(),
            cover_letter_path.display()
        );

        Ok(RenderedFiles {
            resume_path,
            cover_letter_path,
            resume_text,
            cover_letter_text,
        })
    }
}

/// Name line, headline line, then one `- ` line per bullet after a blank line.
pub fn resume_mirror(full_name: &str, resume: &ResumeDraft) -> String {
    let bullets: Vec<String> = resume.bullets().map(|b| format!("- {b}")).collect();
    let mut text = format!(
        "{full_name}\n{}",
        resume.headline.as_deref().unwrap_or_default()
    );
    if !bullets.is_empty() {
        text.push_str("\n\n");
        text.push_str(&bullets.join("\n"));
    }
    text
}

/// File-name segment: spaces become `_`, path separators are dropped.
fn slug(value: Option<&str>, default: &str) -> String {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    value
        .chars()
        .filter(|c| !matches!(c, '/' | '\\'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}
