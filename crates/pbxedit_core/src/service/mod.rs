//! Project graph mutation service.
//!
//! # Responsibility
//! - Own one parsed [`Document`] per [`Project`] handle.
//! - Expose add/remove operations for files, groups, targets, phases and
//!   build settings that keep every cross-section edge paired.
//!
//! # Invariants
//! - Every id written into a record resolves to a record inserted by the
//!   same call, or to one already present.
//! - Hard-required references are validated before the first mutation.
//! - A failed call does not roll back mutations it already applied.
//!
//! [`Document`]: crate::model::document::Document

pub mod files;
pub mod groups;
pub mod project;
pub mod settings;
pub mod targets;

pub use files::SearchPathSource;
pub use groups::{AddedGroup, GroupOptions, LocalizationOptions};
pub use project::{ParseJob, Project};
pub use targets::AddedTarget;

use crate::codec::ParseError;
use crate::model::value::ObjectId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Error for project load, save and mutation calls.
#[derive(Debug)]
pub enum ProjectError {
    /// Manifest text is malformed.
    Parse(ParseError),
    /// Filesystem failure while reading or writing `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document has no `PBXProject` record.
    ProjectNotFound,
    /// The project lists no targets and none was named.
    NoTargets,
    TargetNotFound(String),
    GroupNotFound(String),
    /// The named phase is missing from the target, or from the document.
    BuildPhaseNotFound {
        phase: String,
        target: Option<ObjectId>,
    },
    /// Target name is blank after trim.
    EmptyTargetName,
    InvalidTargetType(String),
    /// A data-model bundle holds no model versions.
    InvalidDataModel(PathBuf),
    /// A background parse ended without delivering a result.
    ParseAborted,
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::ProjectNotFound => write!(f, "document has no PBXProject object"),
            Self::NoTargets => write!(f, "project has no targets"),
            Self::TargetNotFound(target) => write!(f, "invalid target: {target}"),
            Self::GroupNotFound(group) => write!(f, "group not found: {group}"),
            Self::BuildPhaseNotFound { phase, target } => match target {
                Some(target) => write!(f, "build phase `{phase}` not found on target {target}"),
                None => write!(f, "build phase `{phase}` not found"),
            },
            Self::EmptyTargetName => write!(f, "target name missing"),
            Self::InvalidTargetType(kind) => write!(f, "target type invalid: {kind}"),
            Self::InvalidDataModel(path) => {
                write!(f, "no model versions in data model `{}`", path.display())
            }
            Self::ParseAborted => write!(f, "background parse aborted"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for ProjectError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;
