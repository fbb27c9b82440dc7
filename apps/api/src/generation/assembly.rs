//! Résumé assembly: groups enforced items into titled sections, orders the sections
//! and prepends Education straight from the corpus.

use serde::Serialize;

use crate::corpus::models::CorpusDocument;
use crate::generation::enforcer::SelectionGroup;

const EDUCATION_SECTION_ID: &str = "education";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeItem {
    pub employer: String,
    pub role: String,
    pub location: String,
    pub dates: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeSection {
    pub title: String,
    pub items: Vec<ResumeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeDraft {
    pub headline: Option<String>,
    pub sections: Vec<ResumeSection>,
}

impl ResumeDraft {
    pub fn bullets(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| &s.items)
            .flat_map(|i| &i.bullets)
            .map(String::as_str)
    }
}

/// Experience first, then anything starting with "project", then the rest;
/// alphabetical inside each tier.
fn section_rank(title: &str) -> (u8, &str) {
    let lower = title.to_lowercase();
    let tier = if lower == "experience" {
        0
    } else if lower.starts_with("project") {
        1
    } else {
        2
    };
    (tier, title)
}

/// Collects groups under their section titles, keeping item order within a section.
pub fn order_sections(groups: Vec<SelectionGroup>) -> Vec<ResumeSection> {
    let mut sections: Vec<ResumeSection> = Vec::new();

    for group in groups {
        let item = ResumeItem {
            employer: group.employer,
            role: group.role,
            location: group.location,
            dates: group.dates,
            bullets: group.bullets,
        };
        match sections.iter_mut().find(|s| s.title == group.section_title) {
            Some(section) => section.items.push(item),
            None => sections.push(ResumeSection {
                title: group.section_title,
                items: vec![item],
            }),
        }
    }

    sections.sort_by(|a, b| section_rank(&a.title).cmp(&section_rank(&b.title)));
    sections
}

/// Header-only Education section, or `None` when the corpus has no education items.
pub fn education_section(doc: &CorpusDocument) -> Option<ResumeSection> {
    let items: Vec<ResumeItem> = doc
        .section(EDUCATION_SECTION_ID)?
        .items
        .iter()
        .map(|edu| ResumeItem {
            employer: edu
                .institution
                .clone()
                .unwrap_or_else(|| "Education".to_string()),
            role: edu.credential.clone().unwrap_or_default(),
            location: edu.location.clone().unwrap_or_default(),
            dates: edu.dates.display(),
            bullets: Vec::new(),
        })
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(ResumeSection {
            title: "Education".to_string(),
            items,
        })
    }
}

pub fn assemble_resume(
    doc: &CorpusDocument,
    groups: Vec<SelectionGroup>,
    headline: Option<String>,
) -> ResumeDraft {
    let mut sections: Vec<ResumeSection> = education_section(doc).into_iter().collect();
    sections.extend(order_sections(groups));
    ResumeDraft { headline, sections }
}
