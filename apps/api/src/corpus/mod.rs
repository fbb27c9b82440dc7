// Corpus: the read-only master résumé, loaded whole and validated before indexing.

pub mod ingest;
pub mod models;
pub mod validation;

use thiserror::Error;

use crate::corpus::validation::ValidationIssue;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus is not valid JSON for the résumé schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corpus failed validation ({} issue(s)): {}", .0.len(), summarize(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.location, i.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
