//! Core data structures for document representation
//!
//! This module defines the types used to represent a parsed source document:
//! body elements, runs, tables, structured content tags, and the shared
//! resources (styles, numbering) that cloned elements reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// English Metric Units per pixel at 96 DPI.
pub const EMU_PER_PIXEL: u64 = 9525;

/// A verbatim WordprocessingML fragment captured from a source part.
///
/// Raw format blocks are never interpreted, only cloned and reattached, so
/// formatting the model does not cover survives the split byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawXml(pub String);

impl RawXml {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawXml {
    fn from(xml: &str) -> Self {
        RawXml(xml.to_string())
    }
}

/// The parsed source document: an ordered body-element sequence plus the
/// shared resources output documents need to resolve references against.
/// Read-only once parsed; every section borrows from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDocument {
    pub elements: Vec<BodyElement>,
    pub styles: Option<StylesPart>,
    pub numbering: Option<NumberingDefinitions>,
}

/// The source style sheet: the verbatim part text plus a styleId to
/// display-name index used by the heading classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesPart {
    pub xml: String,
    pub names: HashMap<String, String>,
}

impl StylesPart {
    pub fn display_name(&self, style_id: &str) -> Option<&str> {
        self.names.get(style_id).map(String::as_str)
    }
}

/// Shared list/outline numbering rules, one verbatim block per abstract
/// definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NumberingDefinitions {
    pub abstract_nums: Vec<AbstractNumbering>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractNumbering {
    pub id: i64,
    pub xml: RawXml,
}

/// A top-level structural unit of the document body. Sequence order is
/// significant and preserved exactly in each output section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
    StructuredTag(StructuredTag),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub style_id: Option<String>,
    /// Display name of the referenced style, resolved from the styles part.
    pub style_name: Option<String>,
    pub numbering: Option<NumberingRef>,
    /// Verbatim `<w:pPr>` block.
    pub properties: Option<RawXml>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Full visible text: the concatenation of all run texts in run order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingRef {
    pub num_id: i64,
    pub level: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub formatting: RunFormatting,
    /// Verbatim `<w:rPr>` block; when present it takes precedence over the
    /// explicit formatting flags.
    pub properties: Option<RawXml>,
    pub images: Vec<EmbeddedImage>,
}

/// Explicit run formatting attributes, carried alongside the raw properties
/// block for behavioral fidelity with the source system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<String>,
    pub color: Option<String>,
    pub font_family: Option<String>,
    pub size_half_points: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    /// Type identifier, e.g. `png`.
    pub extension: String,
    pub description: String,
    pub width_px: u32,
    pub height_px: u32,
}

impl EmbeddedImage {
    pub fn width_emu(&self) -> u64 {
        self.width_px as u64 * EMU_PER_PIXEL
    }

    pub fn height_emu(&self) -> u64 {
        self.height_px as u64 * EMU_PER_PIXEL
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Verbatim `<w:tblPr>` block.
    pub properties: Option<RawXml>,
    /// Verbatim `<w:tblGrid>` block.
    pub grid: Option<RawXml>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Verbatim `<w:trPr>` block.
    pub properties: Option<RawXml>,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableCell {
    /// Verbatim `<w:tcPr>` block.
    pub properties: Option<RawXml>,
    pub paragraphs: Vec<Paragraph>,
}

/// A structured content tag (SDT) wrapping body content with a metadata tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredTag {
    pub tag: Option<String>,
    pub content: TagContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TagContent {
    Paragraph(Paragraph),
    /// Fallback for tag bodies that are not a simple paragraph; rich
    /// formatting is lost on this path.
    PlainText(String),
}

/// One partition of the source body. Elements are shared borrows into the
/// source document and are never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSection<'a> {
    /// Text of the heading paragraph that opened the section; `None` for the
    /// leading section before any heading was seen.
    pub title: Option<String>,
    pub elements: Vec<&'a BodyElement>,
}

impl<'a> DocumentSection<'a> {
    pub fn untitled() -> Self {
        DocumentSection {
            title: None,
            elements: Vec::new(),
        }
    }

    pub fn titled(title: String) -> Self {
        DocumentSection {
            title: Some(title),
            elements: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dimensions_in_emu() {
        let image = EmbeddedImage {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            extension: "png".to_string(),
            description: String::new(),
            width_px: 100,
            height_px: 50,
        };

        assert_eq!(image.width_emu(), 952_500);
        assert_eq!(image.height_emu(), 476_250);
    }

    #[test]
    fn test_paragraph_text_concatenates_runs_in_order() {
        let paragraph = Paragraph {
            runs: vec![
                Run {
                    text: "Hello ".to_string(),
                    ..Run::default()
                },
                Run {
                    text: "world".to_string(),
                    ..Run::default()
                },
            ],
            ..Paragraph::default()
        };

        assert_eq!(paragraph.text(), "Hello world");
    }
}
