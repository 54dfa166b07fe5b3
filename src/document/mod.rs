//! Document parsing and data structures module
//!
//! This module provides functionality for reading a Word (.docx) package and
//! converting it into the structural model the splitter operates on.

pub(crate) mod io;
pub mod loader;
pub mod models;

// Re-export all models
pub use models::*;
