//! Selection Enforcer: turns the user's confirmed bullets into final per-item groups.
//!
//! Per (section, item), in this order:
//! 1. group in the narrative hint's order when the hint is usable, else selection order
//! 2. every primary bullet of the item, most relevant first
//! 3. the remaining selected bullets, in order, without duplicates
//! 4. backfill non-primary bullets by relevance up to the per-item minimum
//! 5. project items get a skills line as employer and the project name as role
//!
//! The hint only orders. It never adds, drops or outranks the inclusion rules.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::corpus::models::non_blank;
use crate::retrieval::hybrid::ItemRanking;
use crate::retrieval::index::BulletRecord;

const PROJECT_SKILLS_SHOWN: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy {
    pub min_bullets_per_item: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_bullets_per_item: 3,
        }
    }
}

/// Final bullets and header for one item, ready for section assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionGroup {
    pub section_id: String,
    pub item_id: String,
    pub section_title: String,
    pub employer: String,
    pub role: String,
    pub location: String,
    pub dates: String,
    pub bullet_ids: Vec<String>,
    pub bullets: Vec<String>,
}

/// A hint is usable when it is non-empty and names only selected bullets.
pub fn hint_is_usable(hint: &[String], selection: &[BulletRecord]) -> bool {
    let selected: HashSet<&str> = selection.iter().map(|b| b.id.as_str()).collect();
    !hint.is_empty() && hint.iter().all(|id| selected.contains(id.as_str()))
}

/// Selection reordered by the hint; selected bullets the hint omits keep their
/// relative order after the hinted ones.
fn ordered_selection<'a>(
    selection: &'a [BulletRecord],
    hint: Option<&[String]>,
) -> Vec<&'a BulletRecord> {
    let Some(hint) = hint.filter(|h| hint_is_usable(h, selection)) else {
        return selection.iter().collect();
    };

    let by_id: HashMap<&str, &BulletRecord> =
        selection.iter().map(|b| (b.id.as_str(), b)).collect();
    let mut seen = HashSet::new();
    let mut ordered: Vec<&BulletRecord> = hint
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .filter(|&b| seen.insert(b.id.as_str()))
        .collect();
    ordered.extend(selection.iter().filter(|&b| seen.insert(b.id.as_str())));
    ordered
}

fn is_project_title(title: &str) -> bool {
    title.to_lowercase().starts_with("project")
}

/// Builds one group per (section_id, item_id), in first-seen order.
pub fn enforce_selection(
    selection: &[BulletRecord],
    hint: Option<&[String]>,
    ranker: &dyn ItemRanking,
    policy: &SelectionPolicy,
) -> Vec<SelectionGroup> {
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut grouped: HashMap<(String, String), Vec<&BulletRecord>> = HashMap::new();

    for bullet in ordered_selection(selection, hint) {
        let section_id = non_blank(&bullet.metadata.section_id)
            .unwrap_or("exp")
            .to_string();
        let item_id = non_blank(&bullet.metadata.item_id)
            .unwrap_or(bullet.id.as_str())
            .to_string();
        let key = (section_id, item_id);
        let entry = grouped.entry(key.clone()).or_default();
        if entry.is_empty() {
            keys.push(key);
        }
        entry.push(bullet);
    }

    keys.into_iter()
        .filter_map(|key| {
            let chosen = grouped.remove(&key)?;
            Some(build_group(key, &chosen, ranker, policy))
        })
        .collect()
}

/// Final bullet list for one item given the bullets the user chose for it.
pub fn enforce_item_bullets(
    item_id: &str,
    chosen: &[&BulletRecord],
    ranker: &dyn ItemRanking,
    policy: &SelectionPolicy,
) -> Vec<BulletRecord> {
    let ranked = ranker.rank_item_bullets(item_id);
    if ranked.is_empty() {
        warn!("Item '{item_id}' has no indexed bullets; keeping its selection without backfill");
    }

    let mut included = Included::default();
    for b in ranked.iter().filter(|b| b.metadata.primary) {
        included.push(b);
    }
    for &b in chosen {
        included.push(b);
    }
    for b in ranked.iter().filter(|b| !b.metadata.primary) {
        if included.bullets.len() >= policy.min_bullets_per_item {
            break;
        }
        included.push(b);
    }
    let included = included.bullets;

    debug!(
        "Item '{item_id}': {} chosen, {} ranked, {} final",
        chosen.len(),
        ranked.len(),
        included.len()
    );
    included
}

#[derive(Default)]
struct Included {
    bullets: Vec<BulletRecord>,
    seen: HashSet<String>,
}

impl Included {
    fn push(&mut self, bullet: &BulletRecord) {
        if self.seen.insert(bullet.id.clone()) {
            self.bullets.push(bullet.clone());
        }
    }
}

fn build_group(
    (section_id, item_id): (String, String),
    chosen: &[&BulletRecord],
    ranker: &dyn ItemRanking,
    policy: &SelectionPolicy,
) -> SelectionGroup {
    // Header fields come from the first bullet seen for the item.
    let meta = &chosen[0].metadata;
    let section_title = non_blank(&meta.section_title)
        .unwrap_or("Experience")
        .to_string();
    let is_project = is_project_title(&section_title);

    let mut employer = non_blank(&meta.employer)
        .unwrap_or("Experience")
        .to_string();
    let mut role = non_blank(&meta.role)
        .unwrap_or(if is_project { "Project" } else { "" })
        .to_string();

    let bullets = enforce_item_bullets(&item_id, chosen, ranker, policy);

    if is_project {
        role = employer;
        employer = project_skills(&bullets);
    }

    SelectionGroup {
        section_id,
        item_id,
        section_title,
        employer,
        role,
        location: meta.location.clone().unwrap_or_default(),
        dates: meta.dates.display(),
        bullet_ids: bullets.iter().map(|b| b.id.clone()).collect(),
        bullets: bullets.into_iter().map(|b| b.text).collect(),
    }
}

/// Up to three distinct skills across the included bullets, first seen first.
fn project_skills(bullets: &[BulletRecord]) -> String {
    let mut seen = HashSet::new();
    bullets
        .iter()
        .flat_map(|b| &b.metadata.skills)
        .filter(|&s| !s.is_empty() && seen.insert(s.as_str()))
        .take(PROJECT_SKILLS_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" · ")
}
