//! Identity allocation and typed section access over a [`Document`].
//!
//! # Responsibility
//! - Hand out document-unique object ids.
//! - Provide lookups by id, comment, name and path across sections.
//! - Edit group children and build-phase file lists by id and comment.
//!
//! # Invariants
//! - Registry helpers never create cross-section edges on their own; callers
//!   in `service` pair every edge with the record it points at.
//! - Lookups treat quoted and bare string forms as equal.
//!
//! [`Document`]: crate::model::document::Document

mod groups;
mod identity;
mod phases;
mod sections;

pub use groups::GroupCriteria;
pub use sections::DanglingReference;
