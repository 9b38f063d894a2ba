//! Keyword ranking over the resource catalog.
//!
//! Each resource scores one point per keyword found (case-insensitive
//! substring) in its topic or content, plus its static relevance tag:
//!
//! ```text
//! score(r) = |{ k ∈ keywords : k ⊂ lower(r.topic) ∨ k ⊂ lower(r.content) }| + r.relevance_tag
//! ```
//!
//! Keywords are not deduplicated, so a repeated keyword counts once per
//! repetition. Ties keep catalog order (the sort is stable).

use crate::models::{LearningResource, ScoredResource};

/// Scores every resource and returns all of them, highest score first.
///
/// The output is a permutation of `resources`; truncation is the caller's job.
pub fn rank<'a>(resources: &'a [LearningResource], keywords: &[String]) -> Vec<ScoredResource<'a>> {
    let folded: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut scored: Vec<ScoredResource<'a>> = resources
        .iter()
        .map(|resource| ScoredResource {
            score: score_resource(resource, &folded),
            resource,
        })
        .collect();

    // Stable: equal scores stay in catalog order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Score for one resource against already case-folded keywords.
fn score_resource(resource: &LearningResource, folded_keywords: &[String]) -> u64 {
    let topic = resource.topic.to_lowercase();
    let content = resource.content.to_lowercase();

    let matches = folded_keywords
        .iter()
        .filter(|k| topic.contains(k.as_str()) || content.contains(k.as_str()))
        .count() as u64;

    matches + u64::from(resource.relevance_tag)
}
