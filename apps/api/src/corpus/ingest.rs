//! Loads the master résumé JSON, validating it before anything is indexed.

use std::path::Path;

use tracing::info;

use crate::corpus::models::CorpusDocument;
use crate::corpus::validation::validate_corpus;
use crate::corpus::CorpusError;

pub fn parse_corpus(json: &str) -> Result<CorpusDocument, CorpusError> {
    let doc: CorpusDocument = serde_json::from_str(json)?;

    let issues = validate_corpus(&doc);
    if !issues.is_empty() {
        return Err(CorpusError::Invalid(issues));
    }

    Ok(doc)
}

pub async fn load_corpus(path: &Path) -> Result<CorpusDocument, CorpusError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let doc = parse_corpus(&raw)?;
    info!(
        "Loaded corpus from {}: {} sections",
        path.display(),
        doc.sections.len()
    );
    Ok(doc)
}
