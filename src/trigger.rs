//! Resource-request detection in raw model output.
//!
//! The completion service signals that supplemental resources should be
//! attached by emitting the literal [`RESOURCE_MARKER`] followed by
//! whitespace-separated keywords:
//!
//! ```text
//! Great question! Recursion is ...
//! RESOURCE_REQUESTED: arrays recursion
//! ```
//!
//! Everything after the *first* marker is the keyword tail, across lines.
//! A later marker inside that tail is not re-parsed; it is tokenized like
//! any other keyword.

/// Literal, case-sensitive marker introducing the keyword tail.
pub const RESOURCE_MARKER: &str = "RESOURCE_REQUESTED:";

/// Splits `text` at the first marker occurrence.
///
/// Returns the text before the marker and the tail after it, or `None`
/// when the marker is absent.
pub fn split_at_marker(text: &str) -> Option<(&str, &str)> {
    text.find(RESOURCE_MARKER)
        .map(|pos| (&text[..pos], &text[pos + RESOURCE_MARKER.len()..]))
}

/// Whether `text` contains the marker at all.
pub fn has_marker(text: &str) -> bool {
    text.contains(RESOURCE_MARKER)
}

/// Extracts the keyword sequence following the first marker.
///
/// Keywords keep their original case and order. Returns an empty vector when
/// the marker is absent or nothing but whitespace follows it.
pub fn detect(model_output: &str) -> Vec<String> {
    match split_at_marker(model_output) {
        Some((_, tail)) => tail.split_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    }
}
