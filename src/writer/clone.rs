//! Element cloning
//!
//! Deep-copies one body element from the source model into a target output
//! package. Raw property blocks are re-emitted verbatim; explicit formatting
//! attributes are synthesized only when no raw block exists (the raw block
//! subsumes them when both are present). Table-of-contents tags are replaced
//! with an unresolved field placeholder rather than cloned.
//!
//! Every sub-step is fault-isolated: a failed image, table, or tag copy is
//! logged and skipped, never propagated.

use anyhow::Result;

use super::package::{xml_escape_attr, xml_escape_text, OutputPackage};
use crate::document::models::{
    BodyElement, EmbeddedImage, Paragraph, Run, RunFormatting, StructuredTag, Table, TagContent,
};
use crate::error::best_effort;

/// Clone a single body element into the target package, appending it in
/// place. Dispatch is exhaustive over the element variants.
pub fn clone_element(element: &BodyElement, target: &mut OutputPackage) {
    match element {
        BodyElement::Paragraph(paragraph) => {
            let block = paragraph_xml(paragraph, target);
            target.push_block(block);
        }
        BodyElement::Table(table) => {
            if let Some(block) = best_effort("copy table", table_xml(table, target)) {
                target.push_block(block);
            }
        }
        BodyElement::StructuredTag(tag) => clone_structured_tag(tag, target),
    }
}

fn paragraph_xml(paragraph: &Paragraph, target: &mut OutputPackage) -> String {
    let mut xml = String::from("<w:p>");

    // The verbatim block already carries w:pStyle and w:numPr/w:ilvl, so
    // style and numbering references survive exactly as in the source.
    match &paragraph.properties {
        Some(raw) => xml.push_str(raw.as_str()),
        None => xml.push_str(&synthesized_ppr(paragraph)),
    }

    for run in &paragraph.runs {
        xml.push_str(&run_xml(run, target));
    }

    xml.push_str("</w:p>");
    xml
}

fn synthesized_ppr(paragraph: &Paragraph) -> String {
    if paragraph.style_id.is_none() && paragraph.numbering.is_none() {
        return String::new();
    }

    let mut xml = String::from("<w:pPr>");
    if let Some(style_id) = &paragraph.style_id {
        xml.push_str(&format!(
            "<w:pStyle w:val=\"{}\"/>",
            xml_escape_attr(style_id)
        ));
    }
    if let Some(numbering) = &paragraph.numbering {
        xml.push_str("<w:numPr>");
        if let Some(level) = numbering.level {
            xml.push_str(&format!("<w:ilvl w:val=\"{level}\"/>"));
        }
        xml.push_str(&format!("<w:numId w:val=\"{}\"/>", numbering.num_id));
        xml.push_str("</w:numPr>");
    }
    xml.push_str("</w:pPr>");
    xml
}

fn run_xml(run: &Run, target: &mut OutputPackage) -> String {
    let mut xml = String::from("<w:r>");

    // Raw run properties win over the explicit attribute set; the explicit
    // synthesis only fills in when the source had no raw block.
    match &run.properties {
        Some(raw) => xml.push_str(raw.as_str()),
        None => xml.push_str(&synthesized_rpr(&run.formatting)),
    }

    xml.push_str(&format!(
        "<w:t xml:space=\"preserve\">{}</w:t>",
        xml_escape_text(&run.text)
    ));

    for image in &run.images {
        if let Some(drawing) = best_effort("copy picture", drawing_xml(image, target)) {
            xml.push_str(&drawing);
        }
    }

    xml.push_str("</w:r>");
    xml
}

fn synthesized_rpr(formatting: &RunFormatting) -> String {
    if formatting == &RunFormatting::default() {
        return String::new();
    }

    // element order follows the run-properties schema
    let mut xml = String::from("<w:rPr>");
    if let Some(font) = &formatting.font_family {
        let escaped = xml_escape_attr(font);
        xml.push_str(&format!(
            "<w:rFonts w:ascii=\"{escaped}\" w:hAnsi=\"{escaped}\"/>"
        ));
    }
    if formatting.bold {
        xml.push_str("<w:b/>");
    }
    if formatting.italic {
        xml.push_str("<w:i/>");
    }
    if let Some(color) = &formatting.color {
        xml.push_str(&format!("<w:color w:val=\"{}\"/>", xml_escape_attr(color)));
    }
    if let Some(size) = formatting.size_half_points {
        xml.push_str(&format!("<w:sz w:val=\"{size}\"/>"));
    }
    if let Some(underline) = &formatting.underline {
        xml.push_str(&format!("<w:u w:val=\"{}\"/>", xml_escape_attr(underline)));
    }
    xml.push_str("</w:rPr>");
    xml
}

fn drawing_xml(image: &EmbeddedImage, target: &mut OutputPackage) -> Result<String> {
    let rel_id = target.embed_image(image)?;
    let drawing_id = target.media_count();
    let cx = image.width_emu();
    let cy = image.height_emu();
    let descr = xml_escape_attr(&image.description);

    Ok(format!(
        "<w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:effectExtent l=\"0\" t=\"0\" r=\"0\" b=\"0\"/>\
         <wp:docPr id=\"{drawing_id}\" name=\"Picture {drawing_id}\" descr=\"{descr}\"/>\
         <wp:cNvGraphicFramePr/>\
         <a:graphic><a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic>\
         <pic:nvPicPr>\
         <pic:cNvPr id=\"{drawing_id}\" name=\"Picture {drawing_id}\" descr=\"{descr}\"/>\
         <pic:cNvPicPr/>\
         </pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"
    ))
}

fn table_xml(table: &Table, target: &mut OutputPackage) -> Result<String> {
    let mut xml = String::from("<w:tbl>");
    match &table.properties {
        Some(raw) => xml.push_str(raw.as_str()),
        None => xml.push_str("<w:tblPr/>"),
    }
    if let Some(grid) = &table.grid {
        xml.push_str(grid.as_str());
    }

    for row in &table.rows {
        xml.push_str("<w:tr>");
        if let Some(raw) = &row.properties {
            xml.push_str(raw.as_str());
        }
        // cells are rebuilt by positional index; fresh rows carry no
        // default cells, so each source cell maps to a newly created one
        for cell in &row.cells {
            xml.push_str("<w:tc>");
            if let Some(raw) = &cell.properties {
                xml.push_str(raw.as_str());
            }
            if cell.paragraphs.is_empty() {
                // a table cell must hold at least one block element
                xml.push_str("<w:p/>");
            }
            for paragraph in &cell.paragraphs {
                xml.push_str(&paragraph_xml(paragraph, target));
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    Ok(xml)
}

fn clone_structured_tag(tag: &StructuredTag, target: &mut OutputPackage) {
    if is_toc_tag(tag.tag.as_deref()) {
        for block in toc_placeholder_blocks() {
            target.push_block(block);
        }
        return;
    }

    if let Some(block) = best_effort("copy structured tag content", tag_content_xml(tag, target)) {
        target.push_block(block);
    }
}

/// A structured tag whose identifier contains `toc` (case-insensitive) is a
/// table-of-contents field.
pub fn is_toc_tag(tag: Option<&str>) -> bool {
    tag.map(|value| value.to_lowercase().contains("toc"))
        .unwrap_or(false)
}

fn tag_content_xml(tag: &StructuredTag, target: &mut OutputPackage) -> Result<String> {
    let xml = match &tag.content {
        // runs only; the wrapping tag's paragraph properties do not carry over
        TagContent::Paragraph(paragraph) => {
            let mut xml = String::from("<w:p>");
            for run in &paragraph.runs {
                xml.push_str(&run_xml(run, target));
            }
            xml.push_str("</w:p>");
            xml
        }
        // plain-text fallback, rich formatting is lost here
        TagContent::PlainText(text) => format!(
            "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            xml_escape_text(text)
        ),
    };
    Ok(xml)
}

/// The static placeholder emitted instead of a real table of contents: a
/// bold 14-point header, an unresolved TOC field, and a spacer paragraph.
/// The consuming viewer is responsible for recalculating the field.
fn toc_placeholder_blocks() -> [String; 3] {
    [
        "<w:p><w:r><w:rPr><w:b/><w:sz w:val=\"28\"/></w:rPr>\
         <w:t xml:space=\"preserve\">Table of Contents</w:t></w:r></w:p>"
            .to_string(),
        "<w:p>\
         <w:r><w:fldChar w:fldCharType=\"begin\"/></w:r>\
         <w:r><w:instrText xml:space=\"preserve\"> TOC \\o \"1-3\" \\h \\z \\u </w:instrText></w:r>\
         <w:r><w:fldChar w:fldCharType=\"end\"/></w:r>\
         </w:p>"
            .to_string(),
        "<w:p><w:pPr><w:spacing w:after=\"400\"/></w:pPr></w:p>".to_string(),
    ]
}
