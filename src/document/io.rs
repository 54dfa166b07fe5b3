//! Package I/O and validation
//!
//! OPC part access over in-memory .docx bytes. Parts are addressed by their
//! package path (`word/document.xml` and friends); absent optional parts are
//! reported as `None` rather than errors.

use std::io::{Cursor, Read, Seek};

use anyhow::{bail, Context, Result};
use zip::result::ZipError;
use zip::ZipArchive;

/// Validates that the bytes are a legitimate .docx package.
pub(crate) fn validate_docx_bytes(bytes: &[u8]) -> Result<()> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("not a ZIP-based document package")?;

    if archive.by_name("word/document.xml").is_err() {
        // Check if it might be an Excel file
        if archive.by_name("xl/workbook.xml").is_ok() {
            bail!(
                "this appears to be an Excel package (.xlsx); \
                 splitx only supports Word documents (.docx)"
            );
        }

        bail!(
            "invalid .docx package: missing word/document.xml \
             (the file may be corrupted or is not a Word document)"
        );
    }

    Ok(())
}

pub(crate) fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes)).context("could not open document package")
}

/// Read a text part; `Ok(None)` when the part does not exist.
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut text = String::new();
            file.read_to_string(&mut text)
                .with_context(|| format!("could not read package part {name}"))?;
            Ok(Some(text))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("could not open package part {name}")),
    }
}

/// Read a binary part; `Ok(None)` when the part does not exist.
pub(crate) fn read_binary_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)
                .with_context(|| format!("could not read package part {name}"))?;
            Ok(Some(bytes))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("could not open package part {name}")),
    }
}
