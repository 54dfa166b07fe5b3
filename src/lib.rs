//! splitx: split .docx documents into standalone section documents
//!
//! This library partitions a Word document at heading boundaries and rebuilds
//! each partition as an independent, self-contained .docx package. Styles,
//! numbering definitions, run formatting, tables, embedded images, and
//! structured content blocks are carried over into every section document.

pub mod document;
pub mod error;
pub mod split;
pub mod writer;

// Re-export commonly used types
pub use document::loader::load_document;
pub use document::models::{
    BodyElement, DocumentSection, EmbeddedImage, Paragraph, Run, SourceDocument, StructuredTag,
    TagContent,
};
pub use error::SplitError;
pub use split::{extract_sections, is_heading};
pub use writer::{sanitize_file_name, split_docx, FsSink, SectionSink, SplitOutcome};
