//! Declared schema of the master résumé document: sections → items → bullets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusDocument {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub contact: Contact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub label: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// One employment, project, or education entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<String>,
    pub employer: Option<String>,
    /// Project name; stands in for `employer` on project items.
    pub name: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub institution: Option<String>,
    pub credential: Option<String>,
    #[serde(default)]
    pub dates: DateRange,
    #[serde(default)]
    pub bullets: Vec<BulletSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    /// `start–end`, or empty when neither end is set.
    pub fn display(&self) -> String {
        let start = self.start.as_deref().unwrap_or("");
        let end = self.end.as_deref().unwrap_or("");
        if start.is_empty() && end.is_empty() {
            String::new()
        } else {
            format!("{start}–{end}")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSource {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub primary: bool,
}

impl Item {
    /// Employer for experience items, project name for project items.
    pub fn employer_or_name(&self) -> Option<&str> {
        non_blank(&self.employer).or(non_blank(&self.name))
    }
}

/// Blank and whitespace-only strings count as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl CorpusDocument {
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.sections
            .iter()
            .flat_map(|s| &s.items)
            .find(|i| i.id.as_deref() == Some(id))
    }
}
