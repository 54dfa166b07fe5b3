//! Shared-resource transplanting
//!
//! Installs the source style sheet and numbering definitions into a fresh
//! output package so that style and numbering references made by cloned
//! paragraphs resolve. Best-effort: a failure here degrades the section's
//! shared resources, it never aborts the section.

use anyhow::Result;

use super::package::{OutputPackage, DOCUMENT_NAMESPACES, XML_DECL};
use crate::document::models::{NumberingDefinitions, SourceDocument, StylesPart};
use crate::error::best_effort;

/// Assigns numbering-instance identifiers for transplanted abstract
/// definitions.
///
/// The policy mirrors the abstract identifier as the instance identifier,
/// which is what source documents produced by this pipeline's predecessor
/// rely on; the mapping is kept in an explicit table so the policy can
/// change without touching part emission.
#[derive(Debug, Default)]
pub struct NumberingIdAllocator {
    assigned: Vec<i64>,
}

impl NumberingIdAllocator {
    pub fn allocate(&mut self, abstract_id: i64) -> i64 {
        let mut candidate = abstract_id;
        if self.assigned.contains(&candidate) {
            candidate = self.assigned.iter().max().copied().unwrap_or(0) + 1;
        }
        self.assigned.push(candidate);
        candidate
    }
}

/// Copy style sheet and numbering definitions from source into the target
/// package.
pub fn transplant_shared_resources(source: &SourceDocument, target: &mut OutputPackage) {
    if let Some(styles) = &source.styles {
        best_effort("copy style definitions", copy_styles(styles, target));
    }
    if let Some(numbering) = &source.numbering {
        best_effort("copy numbering definitions", copy_numbering(numbering, target));
    }
}

fn copy_styles(styles: &StylesPart, target: &mut OutputPackage) -> Result<()> {
    // exact copy of the source style definitions
    target.set_styles_part(styles.xml.clone());
    Ok(())
}

fn copy_numbering(numbering: &NumberingDefinitions, target: &mut OutputPackage) -> Result<()> {
    let mut allocator = NumberingIdAllocator::default();
    let mut xml = format!("{XML_DECL}<w:numbering{DOCUMENT_NAMESPACES}>");

    // schema order: all abstract definitions, then the instances
    for definition in &numbering.abstract_nums {
        xml.push_str(definition.xml.as_str());
    }
    for definition in &numbering.abstract_nums {
        let instance_id = allocator.allocate(definition.id);
        xml.push_str(&format!(
            "<w:num w:numId=\"{instance_id}\"><w:abstractNumId w:val=\"{}\"/></w:num>",
            definition.id
        ));
    }

    xml.push_str("</w:numbering>");
    target.set_numbering_part(xml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::models::{AbstractNumbering, RawXml};

    #[test]
    fn test_allocator_mirrors_abstract_ids() {
        let mut allocator = NumberingIdAllocator::default();
        assert_eq!(allocator.allocate(3), 3);
        assert_eq!(allocator.allocate(7), 7);
    }

    #[test]
    fn test_allocator_avoids_collisions() {
        let mut allocator = NumberingIdAllocator::default();
        assert_eq!(allocator.allocate(3), 3);
        assert_eq!(allocator.allocate(3), 4);
    }

    #[test]
    fn test_numbering_part_pairs_every_abstract_definition_with_an_instance() {
        let numbering = NumberingDefinitions {
            abstract_nums: vec![AbstractNumbering {
                id: 5,
                xml: RawXml::from("<w:abstractNum w:abstractNumId=\"5\"/>"),
            }],
        };
        let mut target = OutputPackage::new();
        copy_numbering(&numbering, &mut target).unwrap();

        let bytes = target.save().unwrap();
        let mut archive =
            zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice())).unwrap();
        let mut part = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("word/numbering.xml").unwrap(),
            &mut part,
        )
        .unwrap();

        assert!(part.contains("<w:abstractNum w:abstractNumId=\"5\"/>"));
        assert!(part.contains("<w:num w:numId=\"5\"><w:abstractNumId w:val=\"5\"/></w:num>"));
    }
}
