//! Error types and the best-effort failure policy
//!
//! Clone sub-steps are individually fault-isolated: a failed sub-step is
//! logged as a warning and skipped, so one malformed element degrades output
//! quality locally instead of failing the whole split.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("invalid .docx package: {0}")]
    InvalidPackage(String),

    #[error("missing package part: {0}")]
    MissingPart(String),

    #[error("malformed XML in {part}: {source}")]
    MalformedXml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("unsupported image type: {0}")]
    UnsupportedImageType(String),

    #[error("unresolved relationship: {0}")]
    UnresolvedRelationship(String),
}

/// Run a recoverable sub-step, logging and discarding its failure.
///
/// Returns `None` when the step failed; the caller skips the affected unit
/// of work and continues with the next sibling.
pub(crate) fn best_effort<T>(what: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("{what}: {err:#}");
            None
        }
    }
}
