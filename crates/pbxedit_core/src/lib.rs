//! Core editing logic for Xcode `project.pbxproj` manifests.
//! This crate owns the document model, its text codec and every graph mutation.

pub mod codec;
pub mod logging;
pub mod model;
pub mod registry;
pub mod service;

pub use codec::{DocumentParser, DocumentWriter, ParseError, PbxParser, PbxWriter, WriteOptions};
pub use logging::{default_log_level, init_logging, logging_status, LogDestination};
pub use model::document::{Document, Record, Section, SectionKind};
pub use model::file::{DataModelDescriptor, FileDescriptor, FileOptions};
pub use model::target::{
    ConfigurationSpec, CopyDestination, PhaseSpec, ShellScriptOptions, TargetType,
};
pub use model::value::{Dict, ObjectId, ObjectRef, Value};
pub use registry::{DanglingReference, GroupCriteria};
pub use service::{
    AddedGroup, AddedTarget, GroupOptions, LocalizationOptions, ParseJob, Project, ProjectError,
    ProjectResult, SearchPathSource,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
