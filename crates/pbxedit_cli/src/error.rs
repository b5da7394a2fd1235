use pbxedit_core::ProjectError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Failure of one `pbxedit` invocation.
#[derive(Debug)]
pub enum CliError {
    /// No manifest was found from `start` upward.
    ManifestNotFound(PathBuf),
    NotADirectory(PathBuf),
    Logging(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Project(ProjectError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManifestNotFound(start) => write!(
                f,
                "no project.pbxproj found from `{}` upward",
                start.display()
            ),
            Self::NotADirectory(path) => write!(f, "not a directory: {}", path.display()),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "json encoding failed: {err}"),
            Self::Project(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Project(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectError> for CliError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

pub type CliResult<T> = Result<T, CliError>;
