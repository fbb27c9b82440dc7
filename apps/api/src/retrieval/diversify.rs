//! Diversifier: one greedy forward pass that drops near-duplicate openings and caps
//! how many bullets a single employer contributes. Rejected candidates are never
//! revisited.

use std::collections::{HashMap, HashSet};

use crate::retrieval::index::{BulletRecord, ScoredCandidate};

#[derive(Debug, Clone, Copy)]
pub struct DiversityLimits {
    /// Leading characters compared (lowercased) to detect near-duplicates.
    pub prefix_chars: usize,
    /// Max accepted bullets per employer.
    pub per_employer_cap: usize,
}

impl Default for DiversityLimits {
    fn default() -> Self {
        Self {
            prefix_chars: 40,
            per_employer_cap: 6,
        }
    }
}

pub fn diversify(
    ranked: &[ScoredCandidate],
    k: usize,
    limits: &DiversityLimits,
) -> Vec<BulletRecord> {
    let mut selected = Vec::with_capacity(k.min(ranked.len()));
    let mut seen_starts: HashSet<String> = HashSet::new();
    let mut per_employer: HashMap<&str, usize> = HashMap::new();

    for candidate in ranked {
        if selected.len() >= k {
            break;
        }

        let bullet = &candidate.bullet;
        let start: String = bullet
            .text
            .chars()
            .take(limits.prefix_chars)
            .collect::<String>()
            .to_lowercase();
        if seen_starts.contains(&start) {
            continue;
        }

        // Bullets without an employer are never capped.
        if let Some(employer) = bullet.metadata.employer.as_deref() {
            let count = per_employer.entry(employer).or_insert(0);
            if *count >= limits.per_employer_cap {
                continue;
            }
            *count += 1;
        }

        seen_starts.insert(start);
        selected.push(bullet.clone());
    }

    selected
}
