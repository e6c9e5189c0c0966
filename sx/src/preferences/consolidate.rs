//! Preference consolidation
//!
//! Merges newly submitted preferences into the existing list for a fragment,
//! dropping near-duplicates and keeping the rendered section under a size
//! budget. Incoming preferences are never dropped for size; only existing
//! ones are sacrificed, shortest kept first.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::section::section_size;

/// Default budget for the rendered preferences section (characters)
pub const DEFAULT_MAX_SECTION_SIZE: usize = 2000;

/// Default Jaccard similarity at or above which two preferences are duplicates
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Recommended maximum length of a single preference (warned, not enforced)
pub const DEFAULT_SOFT_LIMIT: usize = 200;

/// Lowercased whitespace-separated word set
fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Jaccard similarity of the word sets of two strings
///
/// Returns None when either side has no words; such pairs are never compared.
pub fn jaccard_similarity(a: &str, b: &str) -> Option<f64> {
    let a = tokens(a);
    let b = tokens(b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    Some(intersection as f64 / union as f64)
}

/// Find the first entry in `pool` that `candidate` duplicates
pub fn find_duplicate<'a, S: AsRef<str>>(candidate: &str, pool: &'a [S], threshold: f64) -> Option<&'a str> {
    pool.iter()
        .map(AsRef::as_ref)
        .find(|existing| jaccard_similarity(candidate, existing).is_some_and(|s| s >= threshold))
}

/// An incoming preference that was discarded as a near-duplicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// The discarded incoming preference
    pub incoming: String,
    /// The entry it matched
    pub matched: String,
}

/// Result of a consolidation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consolidation {
    /// Final ordered preference list
    pub preferences: Vec<String>,
    /// Incoming preferences discarded as duplicates (and absent from `preferences`)
    pub duplicates: Vec<Duplicate>,
    /// Existing preferences dropped to fit the budget
    pub dropped: Vec<String>,
    /// Whether the merged list exceeded the budget and was rebuilt
    pub rebuilt: bool,
}

impl Consolidation {
    /// Rendered size of the final list
    pub fn size(&self) -> usize {
        section_size(&self.preferences)
    }
}

/// Merges preference lists under a similarity threshold and size budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consolidator {
    /// Budget for the rendered section
    pub max_size: usize,
    /// Similarity threshold for duplicates
    pub threshold: f64,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SECTION_SIZE,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl Consolidator {
    pub fn new(max_size: usize, threshold: f64) -> Self {
        Self { max_size, threshold }
    }

    /// Merge `incoming` into `existing`
    pub fn consolidate(&self, existing: &[String], incoming: &[String]) -> Consolidation {
        debug!(
            existing = existing.len(),
            incoming = incoming.len(),
            max_size = self.max_size,
            "Consolidator::consolidate: called"
        );
        let mut merged: Vec<String> = existing.to_vec();
        let mut duplicates = Vec::new();

        // Each incoming entry is checked against everything accepted so far
        for pref in incoming {
            match find_duplicate(pref, &merged, self.threshold) {
                Some(matched) => {
                    debug!(incoming = %pref, %matched, "Consolidator::consolidate: duplicate in merge pass");
                    duplicates.push(Duplicate {
                        incoming: pref.clone(),
                        matched: matched.to_string(),
                    });
                }
                None => merged.push(pref.clone()),
            }
        }

        let size = section_size(&merged);
        if size <= self.max_size {
            debug!(size, "Consolidator::consolidate: within budget");
            log_duplicates(&duplicates);
            return Consolidation {
                preferences: merged,
                duplicates,
                dropped: Vec::new(),
                rebuilt: false,
            };
        }

        info!(size, max_size = self.max_size, "Preference section over budget, consolidating");

        // Rebuild: incoming first (checked only against the existing list),
        // then existing entries shortest first until one does not fit
        let mut preferences = Vec::new();
        let mut duplicates = Vec::new();
        for pref in incoming {
            match find_duplicate(pref, existing, self.threshold) {
                Some(matched) => duplicates.push(Duplicate {
                    incoming: pref.clone(),
                    matched: matched.to_string(),
                }),
                None => preferences.push(pref.clone()),
            }
        }

        let mut by_length: Vec<&String> = existing.iter().collect();
        by_length.sort_by_key(|pref| pref.chars().count());

        let mut dropped = Vec::new();
        for (index, pref) in by_length.iter().enumerate() {
            preferences.push((*pref).clone());
            if section_size(&preferences) > self.max_size {
                preferences.pop();
                debug!(%pref, "Consolidator::consolidate: existing entry does not fit, stopping");
                dropped = by_length[index..].iter().map(|p| (*p).clone()).collect();
                break;
            }
        }
        log_duplicates(&duplicates);
        for pref in &dropped {
            warn!(preference = %pref, "Existing preference dropped to fit budget");
        }

        Consolidation {
            preferences,
            duplicates,
            dropped,
            rebuilt: true,
        }
    }
}

fn log_duplicates(duplicates: &[Duplicate]) {
    for duplicate in duplicates {
        warn!(incoming = %duplicate.incoming, matched = %duplicate.matched, "Duplicate preference skipped");
    }
}

/// Merge with the default threshold and the given budget
pub fn consolidate(existing: &[String], incoming: &[String], max_size: usize) -> Vec<String> {
    Consolidator::new(max_size, DEFAULT_SIMILARITY_THRESHOLD)
        .consolidate(existing, incoming)
        .preferences
}

/// Split a `|`-separated prompt string into trimmed, non-empty preferences
pub fn split_prompts(prompts: &str) -> Vec<String> {
    prompts
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Preferences longer than the soft limit
pub fn over_soft_limit(preferences: &[String], soft_limit: usize) -> Vec<&str> {
    preferences
        .iter()
        .filter(|p| p.chars().count() > soft_limit)
        .map(String::as_str)
        .collect()
}
