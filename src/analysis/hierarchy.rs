//! Hierarchy builder - containment relations between detected patterns
//!
//! Finds patterns fully contained within other patterns and records
//! parent/child relations with a combined nesting score. The relation set
//! has no lifecycle of its own; it is recomputed in full on every analysis
//! pass from the current registry.

use crate::analysis::detector::DetectedPattern;

/// A parent/child containment relation between two registry entries
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternRelation {
    /// Content of the longer, containing pattern
    pub parent_content: String,
    /// Content of the contained pattern
    pub child_content: String,
    /// parent.score x child.score at build time
    pub nesting_score: f64,
}

/// Recompute all containment relations from above-threshold entries
///
/// Entries are ordered by (length descending, content ascending) so the
/// pairwise scan is deterministic for a given input sequence. For each
/// ordered pair with a strictly longer outer pattern, a relation is
/// recorded when the outer content contains the inner content as a
/// substring. O(n^2) over the filtered registry, which the engine keeps
/// bounded.
pub fn build_hierarchy(entries: &[&DetectedPattern]) -> Vec<PatternRelation> {
    let mut ordered: Vec<&DetectedPattern> = entries.to_vec();
    ordered.sort_by(|a, b| {
        b.length
            .cmp(&a.length)
            .then_with(|| a.content.cmp(&b.content))
    });

    let mut relations = Vec::new();
    for (i, outer) in ordered.iter().enumerate() {
        for inner in ordered.iter().skip(i + 1) {
            if outer.length <= inner.length {
                continue;
            }
            if outer.content.contains(&inner.content) {
                relations.push(PatternRelation {
                    parent_content: outer.content.clone(),
                    child_content: inner.content.clone(),
                    nesting_score: outer.score * inner.score,
                });
            }
        }
    }
    relations
}

/// Strongest relations first, deterministic tie-break on contents
pub fn top_relations(relations: &[PatternRelation], limit: usize) -> Vec<PatternRelation> {
    let mut sorted: Vec<PatternRelation> = relations.to_vec();
    sorted.sort_by(|a, b| {
        b.nesting_score
            .partial_cmp(&a.nesting_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.parent_content.cmp(&b.parent_content))
            .then_with(|| a.child_content.cmp(&b.child_content))
    });
    sorted.truncate(limit);
    sorted
}
