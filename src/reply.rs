//! Final reply assembly: strip the marker segment and label the top resources.

use crate::models::{LearningResource, ScoredResource};
use crate::trigger::split_at_marker;

/// The student-facing reply and the ordered resource labels attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledReply {
    pub reply: String,
    pub resources_used: Vec<String>,
}

/// Builds the visible reply and labels for the first `limit` ranked resources.
///
/// With a marker present the reply is the trimmed text before the first
/// marker; without one the raw reply is returned untouched.
pub fn assemble(raw_reply: &str, ranked: &[ScoredResource<'_>], limit: usize) -> AssembledReply {
    AssembledReply {
        reply: visible_reply(raw_reply),
        resources_used: ranked
            .iter()
            .take(limit)
            .map(|scored| format_label(scored.resource))
            .collect(),
    }
}

/// The part of `raw_reply` a student should see.
pub fn visible_reply(raw_reply: &str) -> String {
    match split_at_marker(raw_reply) {
        Some((before, _)) => before.trim().to_string(),
        None => raw_reply.to_string(),
    }
}

/// `"Title (difficulty | url)"`, dropping empty parts; the bare title when
/// neither detail is set.
pub fn format_label(resource: &LearningResource) -> String {
    let details: Vec<&str> = [resource.difficulty.as_deref(), resource.url.as_deref()]
        .into_iter()
        .flatten()
        .filter(|d| !d.is_empty())
        .collect();

    if details.is_empty() {
        resource.title.clone()
    } else {
        format!("{} ({})", resource.title, details.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(resources: &[LearningResource]) -> Vec<ScoredResource<'_>> {
        resources
            .iter()
            .map(|r| ScoredResource {
                score: 0,
                resource: r,
            })
            .collect()
    }

    #[test]
    fn test_label_with_both_details() {
        let r = LearningResource::new(1, "X", "", "")
            .with_difficulty("beginner")
            .with_url("https://example.com/x");
        assert_eq!(format_label(&r), "X (beginner | https://example.com/x)");
    }

    #[test]
    fn test_label_bare_title() {
        let r = LearningResource::new(1, "Y", "", "");
        assert_eq!(format_label(&r), "Y");
    }

    #[test]
    fn test_label_single_detail() {
        let url_only = LearningResource::new(1, "Z", "", "").with_url("https://z.dev");
        assert_eq!(format_label(&url_only), "Z (https://z.dev)");

        let difficulty_only = LearningResource::new(2, "W", "", "").with_difficulty("advanced");
        assert_eq!(format_label(&difficulty_only), "W (advanced)");
    }

    #[test]
    fn test_label_skips_empty_strings() {
        let r = LearningResource::new(1, "V", "", "")
            .with_difficulty("")
            .with_url("https://v.dev");
        assert_eq!(format_label(&r), "V (https://v.dev)");
    }

    #[test]
    fn test_strips_marker_segment() {
        let out = assemble("Great question!\nRESOURCE_REQUESTED: arrays recursion", &[], 3);
        assert_eq!(out.reply, "Great question!");
        assert!(out.resources_used.is_empty());
    }

    #[test]
    fn test_no_marker_reply_unchanged() {
        let raw = "  Loops repeat work.\n\n";
        let out = assemble(raw, &[], 3);
        assert_eq!(out.reply, raw);
    }

    #[test]
    fn test_truncates_to_limit_in_rank_order() {
        let resources: Vec<LearningResource> = (1..=5)
            .map(|i| LearningResource::new(i, format!("R{}", i), "", ""))
            .collect();
        let ranked = scored(&resources);
        let out = assemble("Answer RESOURCE_REQUESTED: x", &ranked, 3);
        assert_eq!(out.resources_used, vec!["R1", "R2", "R3"]);
        assert_eq!(out.reply, "Answer");
    }

    #[test]
    fn test_limit_larger_than_catalog() {
        let resources = vec![LearningResource::new(1, "Only", "", "")];
        let ranked = scored(&resources);
        let out = assemble("RESOURCE_REQUESTED: x", &ranked, 3);
        assert_eq!(out.resources_used, vec!["Only"]);
        assert_eq!(out.reply, "");
    }
}
