use std::collections::HashSet;

use serde::Serialize;

use crate::corpus::models::CorpusDocument;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path into the document, e.g. `sections[1].items[0].bullets[2]`.
    pub location: String,
    pub reason: String,
}

/// Checks identifier invariants the index relies on. Returns every issue found.
pub fn validate_corpus(doc: &CorpusDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut bullet_ids = HashSet::new();
    let mut item_ids = HashSet::new();

    for (si, section) in doc.sections.iter().enumerate() {
        if section.id.trim().is_empty() {
            issues.push(ValidationIssue {
                location: format!("sections[{si}]"),
                reason: "section id is empty".to_string(),
            });
        }

        for (ii, item) in section.items.iter().enumerate() {
            let item_path = format!("sections[{si}].items[{ii}]");

            if let Some(id) = &item.id {
                if !item_ids.insert(id.as_str()) {
                    issues.push(ValidationIssue {
                        location: item_path.clone(),
                        reason: format!("duplicate item id '{id}'"),
                    });
                }
            }

            for (bi, bullet) in item.bullets.iter().enumerate() {
                let location = format!("{item_path}.bullets[{bi}]");
                if bullet.id.trim().is_empty() {
                    issues.push(ValidationIssue {
                        location,
                        reason: "bullet id is empty".to_string(),
                    });
                } else if !bullet_ids.insert(bullet.id.as_str()) {
                    issues.push(ValidationIssue {
                        location,
                        reason: format!("duplicate bullet id '{}'", bullet.id),
                    });
                }
            }
        }
    }

    issues
}
