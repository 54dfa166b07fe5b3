//! End-to-end splitting tests against in-memory .docx fixtures.

use std::io::{Cursor, Read, Write};

use splitx::{load_document, split_docx, FsSink, SectionSink, SplitOutcome};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Collects written section documents without touching the filesystem.
#[derive(Default)]
struct MemorySink {
    docs: Vec<(String, Vec<u8>)>,
}

impl SectionSink for MemorySink {
    fn store(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        self.docs.push((name.to_string(), bytes.to_vec()));
        Ok(name.to_string())
    }
}

fn build_docx(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in parts {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn document_part(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"{W_NS}\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
         xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <w:body>{body}</w:body></w:document>"
    )
}

fn simple_docx(body: &str) -> Vec<u8> {
    build_docx(&[("word/document.xml", document_part(body).as_bytes())])
}

fn output_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("output is missing part {name}"))
        .read_to_string(&mut text)
        .unwrap();
    text
}

fn output_binary_part(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut data = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
    data
}

/// Tag names of the body's element children, in order.
fn body_children(document_xml: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(document_xml).unwrap();
    let body = doc
        .descendants()
        .find(|n| n.tag_name().name() == "body")
        .unwrap();
    body.children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name().to_string())
        .collect()
}

fn split_into_memory(source: &[u8], prefix: Option<&str>) -> (SplitOutcome, MemorySink) {
    let mut sink = MemorySink::default();
    let outcome = split_docx(source, prefix, &mut sink);
    (outcome, sink)
}

#[test]
fn test_split_at_headings_end_to_end() {
    let source = simple_docx(
        "<w:p><w:r><w:t>before any heading</w:t></w:r></w:p>\
         <w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>\
         <w:p><w:r><w:t>body text</w:t></w:r></w:p>\
         <w:tbl><w:tblPr/><w:tblGrid/>\
         <w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
         <w:p><w:pPr><w:pStyle w:val=\"heading2\"/></w:pPr><w:r><w:t>Details</w:t></w:r></w:p>",
    );

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success, "error: {:?}", outcome.error);
    assert_eq!(outcome.error, None);

    let names: Vec<&str> = sink.docs.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["section_001", "Intro", "Details"]);

    // element counts per section: [1, 3, 1]
    let first = output_part(&sink.docs[0].1, "word/document.xml");
    assert_eq!(body_children(&first), vec!["p"]);

    let second = output_part(&sink.docs[1].1, "word/document.xml");
    assert_eq!(body_children(&second), vec!["p", "p", "tbl"]);
    // the heading paragraph opens its section
    assert!(second.contains("<w:pStyle w:val=\"Heading1\"/>"));
    assert!(second.contains("cell"));

    let third = output_part(&sink.docs[2].1, "word/document.xml");
    assert_eq!(body_children(&third), vec!["p"]);
    assert!(third.contains("Details"));
}

#[test]
fn test_document_without_headings_yields_one_section_document() {
    let source = simple_docx(
        "<w:p><w:r><w:t>alpha</w:t></w:r></w:p>\
         <w:p><w:r><w:t>beta</w:t></w:r></w:p>",
    );

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);
    assert_eq!(outcome.created, vec!["section_001"]);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("alpha"));
    assert!(doc.contains("beta"));
}

#[test]
fn test_styles_part_is_transplanted_verbatim() {
    let styles = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:styles xmlns:w=\"{W_NS}\">\
         <w:style w:type=\"paragraph\" w:styleId=\"Kop1\">\
         <w:name w:val=\"Heading 1\"/>\
         </w:style></w:styles>"
    );
    let source = build_docx(&[
        (
            "word/document.xml",
            document_part(
                "<w:p><w:r><w:t>preamble</w:t></w:r></w:p>\
                 <w:p><w:pPr><w:pStyle w:val=\"Kop1\"/></w:pPr>\
                 <w:r><w:t>Hoofdstuk</w:t></w:r></w:p>",
            )
            .as_bytes(),
        ),
        ("word/styles.xml", styles.as_bytes()),
    ]);

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);
    // "Kop1" is a heading through its display name, not its id
    assert_eq!(outcome.created, vec!["section_001", "Hoofdstuk"]);

    for (_, bytes) in &sink.docs {
        assert_eq!(output_part(bytes, "word/styles.xml"), styles);
    }
}

#[test]
fn test_numbering_definitions_gain_matching_instances() {
    let numbering = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:numbering xmlns:w=\"{W_NS}\">\
         <w:abstractNum w:abstractNumId=\"4\">\
         <w:lvl w:ilvl=\"0\"><w:numFmt w:val=\"decimal\"/></w:lvl>\
         </w:abstractNum>\
         <w:num w:numId=\"9\"><w:abstractNumId w:val=\"4\"/></w:num>\
         </w:numbering>"
    );
    let source = build_docx(&[
        (
            "word/document.xml",
            document_part(
                "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"4\"/></w:numPr></w:pPr>\
                 <w:r><w:t>item</w:t></w:r></w:p>",
            )
            .as_bytes(),
        ),
        ("word/numbering.xml", numbering.as_bytes()),
    ]);

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);

    let part = output_part(&sink.docs[0].1, "word/numbering.xml");
    assert!(part.contains("<w:abstractNum w:abstractNumId=\"4\">"));
    assert!(part.contains("<w:num w:numId=\"4\"><w:abstractNumId w:val=\"4\"/></w:num>"));
}

#[test]
fn test_raw_run_properties_round_trip_byte_identical() {
    let raw_rpr = "<w:rPr><w:b/><w:color w:val=\"FF0000\"/></w:rPr>";
    let source = simple_docx(&format!(
        "<w:p><w:r>{raw_rpr}<w:t xml:space=\"preserve\">styled text</w:t></w:r></w:p>"
    ));

    let parsed = load_document(&source).unwrap();
    let splitx::BodyElement::Paragraph(paragraph) = &parsed.elements[0] else {
        panic!("expected paragraph");
    };
    let run = &paragraph.runs[0];
    assert!(run.formatting.bold);
    assert!(!run.formatting.italic);
    assert_eq!(run.formatting.color.as_deref(), Some("FF0000"));

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);
    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains(raw_rpr));

    // reparse the output: explicit flags and the raw block both survived
    let reparsed = load_document(&sink.docs[0].1).unwrap();
    let splitx::BodyElement::Paragraph(cloned) = &reparsed.elements[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(cloned.runs[0].formatting, run.formatting);
    assert_eq!(cloned.runs[0].properties.as_ref().unwrap().as_str(), raw_rpr);
    assert_eq!(cloned.runs[0].text, "styled text");
}

fn drawing_fixture(rel_id: &str) -> String {
    format!(
        "<w:drawing><wp:inline>\
         <wp:extent cx=\"952500\" cy=\"476250\"/>\
         <wp:docPr id=\"1\" name=\"Picture 1\" descr=\"logo\"/>\
         <a:graphic><a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic><pic:blipFill><a:blip r:embed=\"{rel_id}\"/></pic:blipFill></pic:pic>\
         </a:graphicData></a:graphic></wp:inline></w:drawing>"
    )
}

fn image_rels(rel_id: &str, target: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"{rel_id}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" \
         Target=\"{target}\"/></Relationships>"
    )
}

#[test]
fn test_embedded_image_is_reembedded_with_recomputed_dimensions() {
    let png_bytes = b"\x89PNG\r\n\x1a\nfake image payload";
    let body = format!(
        "<w:p><w:r><w:t>with image</w:t>{}</w:r></w:p>",
        drawing_fixture("rId7")
    );
    let source = build_docx(&[
        ("word/document.xml", document_part(&body).as_bytes()),
        (
            "word/_rels/document.xml.rels",
            image_rels("rId7", "media/logo.png").as_bytes(),
        ),
        ("word/media/logo.png", png_bytes.as_slice()),
    ]);

    let parsed = load_document(&source).unwrap();
    let splitx::BodyElement::Paragraph(paragraph) = &parsed.elements[0] else {
        panic!("expected paragraph");
    };
    let image = &paragraph.runs[0].images[0];
    assert_eq!(image.width_px, 100);
    assert_eq!(image.height_px, 50);
    assert_eq!(image.description, "logo");

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("cx=\"952500\""));
    assert!(doc.contains("cy=\"476250\""));
    assert!(doc.contains("r:embed=\"rId3\""));
    assert_eq!(
        output_binary_part(&sink.docs[0].1, "word/media/image1.png"),
        png_bytes
    );
}

#[test]
fn test_broken_image_reference_does_not_lose_sibling_text() {
    // drawing points at a relationship that does not exist
    let body = format!(
        "<w:p><w:r><w:t>survivor</w:t>{}</w:r></w:p>\
         <w:p><w:r><w:t>next paragraph</w:t></w:r></w:p>",
        drawing_fixture("rId99")
    );
    let source = simple_docx(&body);

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);
    assert_eq!(sink.docs.len(), 1);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("survivor"));
    assert!(doc.contains("next paragraph"));
}

#[test]
fn test_unsupported_image_type_is_skipped_not_fatal() {
    let body = format!(
        "<w:p><w:r><w:t>survivor</w:t>{}</w:r></w:p>",
        drawing_fixture("rId7")
    );
    let source = build_docx(&[
        ("word/document.xml", document_part(&body).as_bytes()),
        (
            "word/_rels/document.xml.rels",
            image_rels("rId7", "media/logo.svg").as_bytes(),
        ),
        ("word/media/logo.svg", b"<svg/>".as_slice()),
    ]);

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("survivor"));
    assert!(!doc.contains("<w:drawing>"));
}

#[test]
fn test_toc_tag_becomes_placeholder_field() {
    let source = simple_docx(
        "<w:sdt><w:sdtPr><w:tag w:val=\"TOC1\"/></w:sdtPr>\
         <w:sdtContent><w:p><w:r><w:t>stale toc body</w:t></w:r></w:p></w:sdtContent></w:sdt>",
    );

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("Table of Contents"));
    assert!(doc.contains("w:fldCharType=\"begin\""));
    assert!(doc.contains(" TOC \\o \"1-3\" \\h \\z \\u "));
    assert!(doc.contains("w:fldCharType=\"end\""));
    assert!(doc.contains("<w:spacing w:after=\"400\"/>"));
    // the stale cached content is not carried over
    assert!(!doc.contains("stale toc body"));
}

#[test]
fn test_non_toc_tag_content_is_cloned() {
    let source = simple_docx(
        "<w:sdt><w:sdtPr><w:tag w:val=\"Signature\"/></w:sdtPr>\
         <w:sdtContent><w:p><w:r><w:t>signed by</w:t></w:r></w:p></w:sdtContent></w:sdt>",
    );

    let (outcome, sink) = split_into_memory(&source, None);
    assert!(outcome.success);

    let doc = output_part(&sink.docs[0].1, "word/document.xml");
    assert!(doc.contains("signed by"));
    assert!(!doc.contains("Table of Contents"));
}

#[test]
fn test_section_names_are_sanitized_and_prefixed() {
    let source = simple_docx(
        "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr>\
         <w:r><w:t>My: Section? Title</w:t></w:r></w:p>",
    );

    let (outcome, _) = split_into_memory(&source, Some("report"));
    assert!(outcome.success);
    assert_eq!(
        outcome.created,
        vec!["report_section_001", "report_My_Section_Title"]
    );
}

#[test]
fn test_fs_sink_writes_section_documents() {
    let dir = tempfile::tempdir().unwrap();
    let source = simple_docx("<w:p><w:r><w:t>hello</w:t></w:r></w:p>");

    let mut sink = FsSink::new(dir.path());
    let outcome = split_docx(&source, None, &mut sink);
    assert!(outcome.success);

    let path = dir.path().join("section_001.docx");
    assert!(path.is_file());
    let bytes = std::fs::read(&path).unwrap();
    assert!(output_part(&bytes, "word/document.xml").contains("hello"));
    assert_eq!(outcome.created, vec![path.display().to_string()]);
}

#[test]
fn test_unreadable_source_is_a_whole_operation_failure() {
    let (outcome, sink) = split_into_memory(b"definitely not a zip", None);
    assert!(!outcome.success);
    assert!(outcome.created.is_empty());
    assert!(outcome.error.is_some());
    assert!(sink.docs.is_empty());
}

#[test]
fn test_excel_package_is_rejected_with_a_hint() {
    let source = build_docx(&[("xl/workbook.xml", b"<workbook/>".as_slice())]);
    let (outcome, _) = split_into_memory(&source, None);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("Excel"));
}
