//! Section writing and orchestration
//!
//! Drives the whole split: partition the source, then per section create an
//! output package, transplant shared resources, clone every element in
//! order, serialize, and hand the bytes to the storage sink. Produces the
//! overall outcome surface the caller observes.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub mod clone;
pub mod package;
pub mod resources;

pub use clone::clone_element;
pub use package::OutputPackage;
pub use resources::transplant_shared_resources;

use crate::document::loader::load_document;
use crate::document::models::{DocumentSection, SourceDocument};
use crate::split::extract_sections;

/// Storage collaborator for finished section documents.
///
/// `store` persists one serialized package under the derived name and
/// returns the identifier of the created document (for the filesystem sink,
/// its path).
pub trait SectionSink {
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes section documents as `<dir>/<name>.docx`.
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsSink { dir: dir.into() }
    }
}

impl SectionSink for FsSink {
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("could not create output directory {}", self.dir.display()))?;
        let path = self.dir.join(format!("{name}.docx"));
        fs::write(&path, bytes)
            .with_context(|| format!("could not write {}", path.display()))?;
        Ok(path.display().to_string())
    }
}

/// Overall result of one split operation.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub success: bool,
    /// Identifiers of fully written section documents, in partition order.
    pub created: Vec<String>,
    /// Description of the first unrecovered failure, if any.
    pub error: Option<String>,
}

impl SplitOutcome {
    fn completed(created: Vec<String>) -> Self {
        SplitOutcome {
            success: true,
            created,
            error: None,
        }
    }

    fn failed(created: Vec<String>, err: &anyhow::Error) -> Self {
        SplitOutcome {
            success: false,
            created,
            error: Some(format!("{err:#}")),
        }
    }

    pub fn created_display(&self) -> String {
        format!("[{}]", self.created.join(", "))
    }
}

/// Split a .docx package into one standalone document per section.
///
/// Parses the source once, partitions it at heading boundaries, and writes
/// each section through the sink. A fatal failure aborts the remaining
/// sections; documents already stored remain (per-section atomicity, no
/// rollback).
pub fn split_docx(bytes: &[u8], prefix: Option<&str>, sink: &mut dyn SectionSink) -> SplitOutcome {
    let source = match load_document(bytes).context("could not open source document") {
        Ok(source) => source,
        Err(err) => return SplitOutcome::failed(Vec::new(), &err),
    };
    split_source(&source, prefix, sink)
}

/// Split an already-parsed source document.
pub fn split_source(
    source: &SourceDocument,
    prefix: Option<&str>,
    sink: &mut dyn SectionSink,
) -> SplitOutcome {
    let sections = extract_sections(source);
    log::info!("splitting document into {} sections", sections.len());

    let mut created = Vec::new();
    for (index, section) in sections.iter().enumerate() {
        match write_section(source, section, index, prefix, sink) {
            Ok(id) => {
                log::info!("created section file: {id}");
                created.push(id);
            }
            Err(err) => return SplitOutcome::failed(created, &err),
        }
    }

    SplitOutcome::completed(created)
}

fn write_section(
    source: &SourceDocument,
    section: &DocumentSection,
    index: usize,
    prefix: Option<&str>,
    sink: &mut dyn SectionSink,
) -> Result<String> {
    let mut package = OutputPackage::new();
    transplant_shared_resources(source, &mut package);

    for element in &section.elements {
        clone_element(element, &mut package);
    }

    let name = section_file_name(section.title.as_deref(), index, prefix);
    let bytes = package
        .save()
        .with_context(|| format!("could not serialize section {name}"))?;
    sink.store(&name, &bytes)
        .with_context(|| format!("could not store section {name}"))
}

/// Derive the output name for a section: the sanitized heading title when
/// one exists, else `section_NNN` from the one-based position.
pub fn section_file_name(title: Option<&str>, index: usize, prefix: Option<&str>) -> String {
    let base = match title {
        Some(text) if !text.is_empty() => {
            let sanitized = sanitize_file_name(text);
            if sanitized.is_empty() {
                format!("section_{:03}", index + 1)
            } else {
                sanitized
            }
        }
        _ => format!("section_{:03}", index + 1),
    };

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}_{base}"),
        _ => base,
    }
}

/// Characters not allowed in stored document names, plus whitespace; each
/// maximal run collapses to a single underscore.
static UNSAFE_NAME_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\s]+"#).unwrap());

pub fn sanitize_file_name(input: &str) -> String {
    UNSAFE_NAME_RUNS.replace_all(input.trim(), "_").into_owned()
}
