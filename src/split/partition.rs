//! Section partitioning
//!
//! Single pass over the source body: a heading paragraph closes the current
//! section and opens a new one titled with the heading text. The heading
//! itself belongs to the section it opens. Concatenating all sections in
//! order reproduces the source element sequence exactly.

use crate::document::models::{BodyElement, DocumentSection, SourceDocument};
use crate::split::heading::is_heading;

/// Partition the document body into ordered sections.
///
/// The result always starts with the leading section (`title: None`), which
/// covers everything before the first heading and may be empty.
pub fn extract_sections(document: &SourceDocument) -> Vec<DocumentSection<'_>> {
    let mut sections = Vec::new();
    let mut current = DocumentSection::untitled();

    for element in &document.elements {
        if let BodyElement::Paragraph(paragraph) = element {
            if is_heading(paragraph) {
                sections.push(std::mem::replace(
                    &mut current,
                    DocumentSection::titled(paragraph.text()),
                ));
            }
        }
        current.elements.push(element);
    }

    sections.push(current);
    sections
}
