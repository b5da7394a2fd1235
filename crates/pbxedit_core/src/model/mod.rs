//! Project document model.
//!
//! # Responsibility
//! - Define the value tree, records and sections of a project manifest.
//! - Classify files and describe targets/phases before they become records.
//!
//! # Invariants
//! - Every record carries its own id and display comment.
//! - Sections keep explicit order next to their id lookup.

pub mod document;
pub mod file;
pub mod file_type;
pub mod target;
pub mod value;
