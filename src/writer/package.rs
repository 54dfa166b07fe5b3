//! Output package assembly
//!
//! A fresh .docx container under construction. The cloner appends body-level
//! XML blocks and re-embeds media; the transplanter installs the styles and
//! numbering parts; `save()` serializes the whole OPC package (content types,
//! relationships, document part, media) into bytes.
//!
//! An output package owns every byte it holds, so output documents share no
//! structural nodes with the source or with each other.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::document::models::EmbeddedImage;
use crate::error::SplitError;

pub(crate) const XML_DECL: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_TYPE_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

// The standard Word prefix set is declared on the document root so that
// verbatim-copied property blocks keep their prefixes resolvable.
pub(crate) const DOCUMENT_NAMESPACES: &str = concat!(
    " xmlns:wpc=\"http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas\"",
    " xmlns:mc=\"http://schemas.openxmlformats.org/markup-compatibility/2006\"",
    " xmlns:o=\"urn:schemas-microsoft-com:office:office\"",
    " xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"",
    " xmlns:m=\"http://schemas.openxmlformats.org/officeDocument/2006/math\"",
    " xmlns:v=\"urn:schemas-microsoft-com:vml\"",
    " xmlns:wp14=\"http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing\"",
    " xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\"",
    " xmlns:w10=\"urn:schemas-microsoft-com:office:word\"",
    " xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"",
    " xmlns:w14=\"http://schemas.microsoft.com/office/word/2010/wordml\"",
    " xmlns:w15=\"http://schemas.microsoft.com/office/word/2012/wordml\"",
    " xmlns:wpg=\"http://schemas.microsoft.com/office/word/2010/wordprocessingGroup\"",
    " xmlns:wpi=\"http://schemas.microsoft.com/office/word/2010/wordprocessingInk\"",
    " xmlns:wne=\"http://schemas.microsoft.com/office/word/2006/wordml\"",
    " xmlns:wps=\"http://schemas.microsoft.com/office/word/2010/wordprocessingShape\"",
    " xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\"",
    " xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\"",
    " mc:Ignorable=\"w14 w15 wp14\"",
);

// Relationship ids rId1/rId2 are reserved for the styles and numbering
// parts; media relationships start at rId3.
const FIRST_MEDIA_REL: usize = 3;

#[derive(Debug, Clone)]
struct MediaEntry {
    file_name: String,
    extension: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct OutputPackage {
    body: Vec<String>,
    styles_xml: Option<String>,
    numbering_xml: Option<String>,
    media: Vec<MediaEntry>,
}

impl OutputPackage {
    pub fn new() -> Self {
        OutputPackage::default()
    }

    /// Append a body-level XML block (paragraph or table) in document order.
    pub fn push_block(&mut self, xml: String) {
        self.body.push(xml);
    }

    pub fn set_styles_part(&mut self, xml: String) {
        self.styles_xml = Some(xml);
    }

    pub fn set_numbering_part(&mut self, xml: String) {
        self.numbering_xml = Some(xml);
    }

    /// Re-embed image bytes as a media part and return the relationship id
    /// a drawing must reference.
    pub fn embed_image(&mut self, image: &EmbeddedImage) -> Result<String, SplitError> {
        if content_type_for(&image.extension).is_none() {
            return Err(SplitError::UnsupportedImageType(image.extension.clone()));
        }

        let ordinal = self.media.len() + 1;
        let rel_id = format!("rId{}", self.media.len() + FIRST_MEDIA_REL);
        self.media.push(MediaEntry {
            file_name: format!("media/image{ordinal}.{}", image.extension),
            extension: image.extension.clone(),
            bytes: image.bytes.clone(),
        });
        Ok(rel_id)
    }

    /// Ordinal of the most recently embedded image, used for drawing ids.
    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    /// Serialize the package into .docx bytes.
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        write_entry(
            &mut writer,
            "[Content_Types].xml",
            self.content_types_xml().as_bytes(),
            options,
        )?;
        write_entry(
            &mut writer,
            "_rels/.rels",
            self.package_rels_xml().as_bytes(),
            options,
        )?;
        write_entry(
            &mut writer,
            "word/document.xml",
            self.document_xml().as_bytes(),
            options,
        )?;
        write_entry(
            &mut writer,
            "word/_rels/document.xml.rels",
            self.document_rels_xml().as_bytes(),
            options,
        )?;

        if let Some(styles) = &self.styles_xml {
            write_entry(&mut writer, "word/styles.xml", styles.as_bytes(), options)?;
        }
        if let Some(numbering) = &self.numbering_xml {
            write_entry(
                &mut writer,
                "word/numbering.xml",
                numbering.as_bytes(),
                options,
            )?;
        }
        for entry in &self.media {
            write_entry(
                &mut writer,
                &format!("word/{}", entry.file_name),
                &entry.bytes,
                options,
            )?;
        }

        let cursor = writer
            .finish()
            .context("could not finish output package")?;
        Ok(cursor.into_inner())
    }

    fn document_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str("<w:document");
        xml.push_str(DOCUMENT_NAMESPACES);
        xml.push_str("><w:body>");
        for block in &self.body {
            xml.push_str(block);
        }
        xml.push_str("</w:body></w:document>");
        xml
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        );

        let mut seen = Vec::new();
        for entry in &self.media {
            if seen.contains(&entry.extension) {
                continue;
            }
            if let Some(content_type) = content_type_for(&entry.extension) {
                xml.push_str(&format!(
                    "<Default Extension=\"{}\" ContentType=\"{content_type}\"/>",
                    entry.extension
                ));
            }
            seen.push(entry.extension.clone());
        }

        xml.push_str(
            "<Override PartName=\"/word/document.xml\" \
             ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
        );
        if self.styles_xml.is_some() {
            xml.push_str(
                "<Override PartName=\"/word/styles.xml\" \
                 ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
            );
        }
        if self.numbering_xml.is_some() {
            xml.push_str(
                "<Override PartName=\"/word/numbering.xml\" \
                 ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml\"/>",
            );
        }
        xml.push_str("</Types>");
        xml
    }

    fn package_rels_xml(&self) -> String {
        format!(
            "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"{REL_TYPE_OFFICE_DOCUMENT}\" Target=\"word/document.xml\"/>\
             </Relationships>"
        )
    }

    fn document_rels_xml(&self) -> String {
        let mut xml = format!(
            "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
        );
        if self.styles_xml.is_some() {
            xml.push_str(&format!(
                "<Relationship Id=\"rId1\" Type=\"{REL_TYPE_STYLES}\" Target=\"styles.xml\"/>"
            ));
        }
        if self.numbering_xml.is_some() {
            xml.push_str(&format!(
                "<Relationship Id=\"rId2\" Type=\"{REL_TYPE_NUMBERING}\" Target=\"numbering.xml\"/>"
            ));
        }
        for (index, entry) in self.media.iter().enumerate() {
            xml.push_str(&format!(
                "<Relationship Id=\"rId{}\" Type=\"{REL_TYPE_IMAGE}\" Target=\"{}\"/>",
                index + FIRST_MEDIA_REL,
                xml_escape_attr(&entry.file_name)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn write_entry<W: Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    writer
        .start_file(name, options)
        .with_context(|| format!("could not start package entry {name}"))?;
    writer
        .write_all(bytes)
        .with_context(|| format!("could not write package entry {name}"))?;
    Ok(())
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpeg" | "jpg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "emf" => Some("image/x-emf"),
        "wmf" => Some("image/x-wmf"),
        _ => None,
    }
}

pub(crate) fn xml_escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn xml_escape_attr(value: &str) -> String {
    xml_escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_package_serializes_with_required_parts() {
        let package = OutputPackage::new();
        let bytes = package.save().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(archive.by_name(part).is_ok(), "missing part {part}");
        }
    }

    #[test]
    fn test_embedded_media_gets_sequential_relationship_ids() {
        let mut package = OutputPackage::new();
        let image = EmbeddedImage {
            bytes: vec![1, 2, 3],
            extension: "png".to_string(),
            description: String::new(),
            width_px: 1,
            height_px: 1,
        };

        assert_eq!(package.embed_image(&image).unwrap(), "rId3");
        assert_eq!(package.embed_image(&image).unwrap(), "rId4");
        assert!(package
            .document_rels_xml()
            .contains("Target=\"media/image2.png\""));
    }

    #[test]
    fn test_unknown_image_extension_is_rejected() {
        let mut package = OutputPackage::new();
        let image = EmbeddedImage {
            bytes: vec![1],
            extension: "svg".to_string(),
            description: String::new(),
            width_px: 1,
            height_px: 1,
        };

        assert!(matches!(
            package.embed_image(&image),
            Err(SplitError::UnsupportedImageType(_))
        ));
    }

    #[test]
    fn test_escaping_helpers() {
        assert_eq!(xml_escape_text("a & <b>"), "a &amp; &lt;b&gt;");
        assert_eq!(xml_escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }
}
