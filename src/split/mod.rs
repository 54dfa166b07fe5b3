//! Section partitioning
//!
//! Decides where sections begin (heading classification) and groups the body
//! element sequence into ordered sections.

pub mod heading;
pub mod partition;

pub use heading::is_heading;
pub use partition::extract_sections;
