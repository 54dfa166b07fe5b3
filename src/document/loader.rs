//! Document loading
//!
//! `load_document()` parses a .docx package into the structural model in one
//! pass: shared resources first (styles, numbering, relationships, media),
//! then the body element sequence. Formatting blocks the model does not
//! interpret are captured verbatim through XML node byte ranges so the cloner
//! can re-emit them untouched.

use std::collections::HashMap;

use anyhow::Result;
use roxmltree::{Document as XmlDocument, Node};

use super::io::{open_archive, read_binary_part, read_part, validate_docx_bytes};
use super::models::*;
use crate::error::{best_effort, SplitError};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

#[derive(Debug, Clone)]
struct Relationship {
    rel_type: String,
    target: String,
}

/// Everything paragraph/run parsing needs besides the node itself.
struct PartContext<'doc> {
    text: &'doc str,
    style_names: &'doc HashMap<String, String>,
    rels: &'doc HashMap<String, Relationship>,
    media: &'doc HashMap<String, Vec<u8>>,
}

/// Parse a .docx package into the structural model.
///
/// The returned document is read-only source material for the whole split
/// operation; sections borrow from it and cloning never mutates it.
pub fn load_document(bytes: &[u8]) -> Result<SourceDocument> {
    validate_docx_bytes(bytes)?;
    let mut archive = open_archive(bytes)?;

    let styles = read_part(&mut archive, STYLES_PART)?.map(|xml| {
        let names = best_effort("index style names", parse_style_names(&xml)).unwrap_or_default();
        StylesPart { xml, names }
    });

    let numbering = match read_part(&mut archive, NUMBERING_PART)? {
        Some(xml) => best_effort("read numbering definitions", parse_numbering(&xml)),
        None => None,
    };

    let rels = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
        Some(xml) => best_effort("read document relationships", parse_relationships(&xml))
            .unwrap_or_default(),
        None => HashMap::new(),
    };

    // Media bytes are fetched eagerly, keyed by relationship id; a broken
    // media entry costs only that image.
    let mut media = HashMap::new();
    for (id, rel) in &rels {
        if !rel.rel_type.ends_with("/image") {
            continue;
        }
        let part_name = format!("word/{}", rel.target);
        let loaded = best_effort(
            &format!("read media part {part_name}"),
            read_binary_part(&mut archive, &part_name).and_then(|part| {
                part.ok_or_else(|| SplitError::MissingPart(part_name.clone()).into())
            }),
        );
        if let Some(bytes) = loaded {
            media.insert(id.clone(), bytes);
        }
    }

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| SplitError::MissingPart(DOCUMENT_PART.to_string()))?;
    let doc = XmlDocument::parse(&document_xml).map_err(|source| SplitError::MalformedXml {
        part: DOCUMENT_PART.to_string(),
        source,
    })?;

    let empty_names = HashMap::new();
    let ctx = PartContext {
        text: &document_xml,
        style_names: styles.as_ref().map(|s| &s.names).unwrap_or(&empty_names),
        rels: &rels,
        media: &media,
    };

    let body = element_children(doc.root_element())
        .find(|node| is_named(*node, "body"))
        .ok_or_else(|| SplitError::InvalidPackage("document has no body".to_string()))?;

    let mut elements = Vec::new();
    for node in element_children(body) {
        match node.tag_name().name() {
            "p" => elements.push(BodyElement::Paragraph(parse_paragraph(node, &ctx))),
            "tbl" => elements.push(BodyElement::Table(parse_table(node, &ctx))),
            "sdt" => elements.push(BodyElement::StructuredTag(parse_structured_tag(node, &ctx))),
            // sectPr, bookmarks, proofing marks: not body elements
            _ => {}
        }
    }

    log::debug!(
        "loaded document: {} body elements, styles: {}, abstract numbering definitions: {}",
        elements.len(),
        styles.is_some(),
        numbering.as_ref().map(|n| n.abstract_nums.len()).unwrap_or(0),
    );

    Ok(SourceDocument {
        elements,
        styles,
        numbering,
    })
}

fn parse_paragraph(node: Node, ctx: &PartContext) -> Paragraph {
    let ppr = element_children(node).find(|n| is_named(*n, "pPr"));
    let properties = ppr.map(|n| capture_raw(n, ctx));

    let style_id = ppr
        .and_then(|n| element_children(n).find(|c| is_named(*c, "pStyle")))
        .and_then(|n| attr_value(n, "val"));
    let style_name = style_id
        .as_deref()
        .and_then(|id| ctx.style_names.get(id))
        .cloned();

    let numbering = ppr
        .and_then(|n| element_children(n).find(|c| is_named(*c, "numPr")))
        .and_then(|num_pr| {
            let num_id = element_children(num_pr)
                .find(|c| is_named(*c, "numId"))
                .and_then(|n| attr_value(n, "val"))
                .and_then(|val| val.parse::<i64>().ok())?;
            let level = element_children(num_pr)
                .find(|c| is_named(*c, "ilvl"))
                .and_then(|n| attr_value(n, "val"))
                .and_then(|val| val.parse::<i64>().ok());
            Some(NumberingRef { num_id, level })
        });

    let mut runs = Vec::new();
    for child in element_children(node) {
        match child.tag_name().name() {
            "r" => runs.push(parse_run(child, ctx)),
            // Hyperlink-wrapped runs are flattened to plain runs; the link
            // itself is dropped (known lossy path).
            "hyperlink" => {
                for nested in element_children(child).filter(|n| is_named(*n, "r")) {
                    runs.push(parse_run(nested, ctx));
                }
            }
            _ => {}
        }
    }

    Paragraph {
        style_id,
        style_name,
        numbering,
        properties,
        runs,
    }
}

fn parse_run(node: Node, ctx: &PartContext) -> Run {
    let rpr = element_children(node).find(|n| is_named(*n, "rPr"));
    let properties = rpr.map(|n| capture_raw(n, ctx));
    let formatting = rpr.map(extract_run_formatting).unwrap_or_default();

    let mut text = String::new();
    for child in element_children(node) {
        match child.tag_name().name() {
            "t" => {
                if let Some(value) = child.text() {
                    text.push_str(value);
                }
            }
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }

    let mut images = Vec::new();
    for drawing in node.descendants().filter(|n| is_named(*n, "drawing")) {
        if let Some(image) = best_effort("read embedded image", parse_image(drawing, ctx)) {
            images.push(image);
        }
    }

    Run {
        text,
        formatting,
        properties,
        images,
    }
}

/// Explicit formatting attributes of a run, extracted alongside the verbatim
/// properties block.
fn extract_run_formatting(rpr: Node) -> RunFormatting {
    let find = |name: &str| element_children(rpr).find(|n| is_named(*n, name));

    RunFormatting {
        bold: on_off(find("b")),
        italic: on_off(find("i")),
        underline: find("u").and_then(|n| attr_value(n, "val")),
        color: find("color").and_then(|n| attr_value(n, "val")),
        font_family: find("rFonts").and_then(|n| attr_value(n, "ascii")),
        size_half_points: find("sz")
            .and_then(|n| attr_value(n, "val"))
            .and_then(|val| val.parse::<u32>().ok()),
    }
}

/// An on/off property is set when the element is present, unless it carries
/// an explicit false value.
fn on_off(node: Option<Node>) -> bool {
    match node {
        Some(n) => match attr_value(n, "val") {
            Some(val) => val != "false" && val != "0",
            None => true,
        },
        None => false,
    }
}

fn parse_image(drawing: Node, ctx: &PartContext) -> Result<EmbeddedImage> {
    let rel_id = drawing
        .descendants()
        .find(|n| is_named(*n, "blip"))
        .and_then(|n| attr_value(n, "embed"))
        .ok_or_else(|| SplitError::InvalidPackage("drawing without image reference".into()))?;

    let rel = ctx
        .rels
        .get(&rel_id)
        .ok_or_else(|| SplitError::UnresolvedRelationship(rel_id.clone()))?;
    let bytes = ctx
        .media
        .get(&rel_id)
        .ok_or_else(|| SplitError::MissingPart(format!("word/{}", rel.target)))?
        .clone();

    let extension = rel
        .target
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    let extent = drawing
        .descendants()
        .find(|n| is_named(*n, "extent"))
        .ok_or_else(|| SplitError::InvalidPackage("drawing without extent".into()))?;
    let width_emu = attr_value(extent, "cx")
        .and_then(|val| val.parse::<u64>().ok())
        .ok_or_else(|| SplitError::InvalidPackage("drawing extent has no width".into()))?;
    let height_emu = attr_value(extent, "cy")
        .and_then(|val| val.parse::<u64>().ok())
        .ok_or_else(|| SplitError::InvalidPackage("drawing extent has no height".into()))?;

    let description = drawing
        .descendants()
        .find(|n| is_named(*n, "docPr"))
        .and_then(|n| attr_value(n, "descr").or_else(|| attr_value(n, "name")))
        .unwrap_or_default();

    Ok(EmbeddedImage {
        bytes,
        extension,
        description,
        width_px: (width_emu / EMU_PER_PIXEL) as u32,
        height_px: (height_emu / EMU_PER_PIXEL) as u32,
    })
}

fn parse_table(node: Node, ctx: &PartContext) -> Table {
    let properties = element_children(node)
        .find(|n| is_named(*n, "tblPr"))
        .map(|n| capture_raw(n, ctx));
    let grid = element_children(node)
        .find(|n| is_named(*n, "tblGrid"))
        .map(|n| capture_raw(n, ctx));

    let rows = element_children(node)
        .filter(|n| is_named(*n, "tr"))
        .map(|row| TableRow {
            properties: element_children(row)
                .find(|n| is_named(*n, "trPr"))
                .map(|n| capture_raw(n, ctx)),
            cells: element_children(row)
                .filter(|n| is_named(*n, "tc"))
                .map(|cell| TableCell {
                    properties: element_children(cell)
                        .find(|n| is_named(*n, "tcPr"))
                        .map(|n| capture_raw(n, ctx)),
                    paragraphs: element_children(cell)
                        .filter(|n| is_named(*n, "p"))
                        .map(|p| parse_paragraph(p, ctx))
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Table {
        properties,
        grid,
        rows,
    }
}

fn parse_structured_tag(node: Node, ctx: &PartContext) -> StructuredTag {
    let tag = element_children(node)
        .find(|n| is_named(*n, "sdtPr"))
        .and_then(|pr| element_children(pr).find(|n| is_named(*n, "tag")))
        .and_then(|n| attr_value(n, "val"));

    let content = match element_children(node).find(|n| is_named(*n, "sdtContent")) {
        Some(content_node) => {
            let children: Vec<Node> = element_children(content_node).collect();
            match children.as_slice() {
                [only] if is_named(*only, "p") => {
                    TagContent::Paragraph(parse_paragraph(*only, ctx))
                }
                _ => TagContent::PlainText(collect_text(content_node)),
            }
        }
        None => TagContent::PlainText(String::new()),
    };

    StructuredTag { tag, content }
}

fn collect_text(node: Node) -> String {
    node.descendants()
        .filter(|n| is_named(*n, "t"))
        .filter_map(|n| n.text())
        .collect()
}

fn parse_style_names(styles_xml: &str) -> Result<HashMap<String, String>> {
    let doc = XmlDocument::parse(styles_xml).map_err(|source| SplitError::MalformedXml {
        part: STYLES_PART.to_string(),
        source,
    })?;

    let mut names = HashMap::new();
    for style in doc.descendants().filter(|n| is_named(*n, "style")) {
        let Some(style_id) = attr_value(style, "styleId") else {
            continue;
        };
        if let Some(name) = element_children(style)
            .find(|n| is_named(*n, "name"))
            .and_then(|n| attr_value(n, "val"))
        {
            names.insert(style_id, name);
        }
    }
    Ok(names)
}

fn parse_numbering(numbering_xml: &str) -> Result<NumberingDefinitions> {
    let doc = XmlDocument::parse(numbering_xml).map_err(|source| SplitError::MalformedXml {
        part: NUMBERING_PART.to_string(),
        source,
    })?;

    let mut abstract_nums = Vec::new();
    for node in doc.descendants().filter(|n| is_named(*n, "abstractNum")) {
        let Some(id) = attr_value(node, "abstractNumId").and_then(|val| val.parse::<i64>().ok())
        else {
            continue;
        };
        abstract_nums.push(AbstractNumbering {
            id,
            xml: RawXml(numbering_xml[node.range()].to_string()),
        });
    }

    Ok(NumberingDefinitions { abstract_nums })
}

fn parse_relationships(rels_xml: &str) -> Result<HashMap<String, Relationship>> {
    let doc = XmlDocument::parse(rels_xml).map_err(|source| SplitError::MalformedXml {
        part: DOCUMENT_RELS_PART.to_string(),
        source,
    })?;

    let mut rels = HashMap::new();
    for node in doc.descendants().filter(|n| is_named(*n, "Relationship")) {
        let (Some(id), Some(rel_type), Some(target)) = (
            attr_value(node, "Id"),
            attr_value(node, "Type"),
            attr_value(node, "Target"),
        ) else {
            continue;
        };
        rels.insert(id, Relationship { rel_type, target });
    }
    Ok(rels)
}

// XML helpers; names are matched by local name so source namespace prefixes
// do not matter.

fn is_named(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn attr_value(node: Node, name: &str) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value().to_string())
}

fn capture_raw(node: Node, ctx: &PartContext) -> RawXml {
    RawXml(ctx.text[node.range()].to_string())
}
