//! Heading classification
//!
//! A paragraph marks a new section when its style identifies it as a heading.
//! Pure predicate: no side effects, no failure modes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::models::Paragraph;

/// Matches the compact HTML-style heading ids `h1`..`h9`.
static H_LEVEL_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^h[1-9]$").unwrap());

/// Whether the paragraph opens a new section.
///
/// True when the style id (lower-cased) starts with `heading`, the style
/// display name starts with `Heading` (case-sensitive), or the style id is
/// exactly `h1`..`h9`. A paragraph without style information is never a
/// heading.
pub fn is_heading(paragraph: &Paragraph) -> bool {
    if let Some(style_id) = &paragraph.style_id {
        if style_id.to_lowercase().starts_with("heading") {
            return true;
        }
        if H_LEVEL_STYLE.is_match(style_id) {
            return true;
        }
    }

    matches!(&paragraph.style_name, Some(name) if name.starts_with("Heading"))
}
