//! Project handle: load, lookup, write and save.
//!
//! # Responsibility
//! - Bind a [`Document`] to the manifest path it was read from.
//! - Offer read-only lookups used by callers before mutating.
//! - Run the initial parse off the calling thread when asked to.
//!
//! # Invariants
//! - `src_root` is the directory two levels above the manifest file.
//! - A [`ParseJob`] delivers at most one result.

use crate::codec::{DocumentParser, DocumentWriter, PbxParser, PbxWriter, WriteOptions};
use crate::model::document::{Document, Record, SectionKind};
use crate::model::value::ObjectId;
use crate::registry::{DanglingReference, GroupCriteria};
use crate::service::{ProjectError, ProjectResult};
use log::{error, info};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// One project manifest loaded into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    filepath: PathBuf,
    pub(crate) document: Document,
}

/// Handle to a parse running on a background thread.
#[derive(Debug)]
pub struct ParseJob {
    receiver: Receiver<ProjectResult<Project>>,
}

impl ParseJob {
    /// Blocks until the parse finishes.
    pub fn wait(self) -> ProjectResult<Project> {
        self.receiver.recv().unwrap_or(Err(ProjectError::ParseAborted))
    }

    /// Returns the result when ready, `None` while the parse still runs.
    ///
    /// The result is handed out once; later calls report
    /// [`ProjectError::ParseAborted`].
    pub fn try_result(&self) -> Option<ProjectResult<Project>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ProjectError::ParseAborted)),
        }
    }
}

impl Project {
    /// Reads and parses the manifest at `path`.
    pub fn open(path: impl AsRef<Path>) -> ProjectResult<Self> {
        Self::open_with(path, &PbxParser)
    }

    pub fn open_with<P: DocumentParser>(path: impl AsRef<Path>, parser: &P) -> ProjectResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_text(path, &text, parser)
    }

    /// Parses `text` as if it had been read from `filepath`.
    pub fn parse_text<P: DocumentParser>(
        filepath: impl Into<PathBuf>,
        text: &str,
        parser: &P,
    ) -> ProjectResult<Self> {
        let filepath = filepath.into();
        match parser.parse(text) {
            Ok(document) => {
                info!(
                    "event=project_parse module=service status=ok sections={} path={}",
                    document.sections().len(),
                    filepath.display()
                );
                Ok(Self { filepath, document })
            }
            Err(err) => {
                error!(
                    "event=project_parse module=service status=error line={} column={}",
                    err.line, err.column
                );
                Err(err.into())
            }
        }
    }

    pub fn from_document(filepath: impl Into<PathBuf>, document: Document) -> Self {
        Self {
            filepath: filepath.into(),
            document,
        }
    }

    /// Starts parsing `path` on a new thread.
    ///
    /// A parse that panics is reported as [`ProjectError::ParseAborted`].
    pub fn parse_in_background(path: impl Into<PathBuf>) -> ParseJob {
        let path = path.into();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _ = sender.send(Self::open(&path));
        });
        ParseJob { receiver }
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Directory the project's relative paths are anchored at.
    pub fn src_root(&self) -> PathBuf {
        self.filepath
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn write_string(&self, options: &WriteOptions) -> String {
        self.write_with(&PbxWriter, options)
    }

    pub fn write_with<W: DocumentWriter>(&self, writer: &W, options: &WriteOptions) -> String {
        writer.write(&self.document, options)
    }

    /// Writes the document back to the manifest it was loaded from.
    pub fn save(&self, options: &WriteOptions) -> ProjectResult<()> {
        self.save_to(&self.filepath, options)
    }

    pub fn save_to(&self, path: impl AsRef<Path>, options: &WriteOptions) -> ProjectResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.write_string(options)).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "event=project_save module=service status=ok path={}",
            path.display()
        );
        Ok(())
    }

    pub fn generate_uuid(&mut self) -> ObjectId {
        self.document.allocate_id()
    }

    pub fn all_uuids(&self) -> Vec<ObjectId> {
        self.document.all_ids()
    }

    pub fn first_project(&self) -> Option<&Record> {
        self.document.first_project()
    }

    /// The first native target listed by the project.
    pub fn first_target(&self) -> Option<&Record> {
        let id = self.document.first_target_id()?;
        self.document.native_target(id.as_str())
    }

    /// Native target by display comment.
    pub fn target_by_name(&self, name: &str) -> Option<&Record> {
        self.document.item_by_comment(SectionKind::NativeTarget, name)
    }

    /// Native target id by `name` field.
    pub fn find_target_key(&self, name: &str) -> Option<ObjectId> {
        self.document.target_key_by_name(name)
    }

    pub fn item_by_comment(&self, kind: SectionKind, comment: &str) -> Option<&Record> {
        self.document.item_by_comment(kind, comment)
    }

    /// File reference recorded at `path`, quoted or bare.
    pub fn has_file(&self, path: &str) -> Option<&Record> {
        self.document.file_reference_by_path(path)
    }

    pub fn file_key(&self, path: &str) -> Option<ObjectId> {
        self.has_file(path).map(|record| record.id.clone())
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Record> {
        self.document.group_by_name(name)
    }

    pub fn find_group_key(&self, criteria: &GroupCriteria<'_>) -> Option<ObjectId> {
        self.document.find_group_key(SectionKind::Group, criteria)
    }

    pub fn find_variant_group_key(&self, criteria: &GroupCriteria<'_>) -> Option<ObjectId> {
        self.document.find_group_key(SectionKind::VariantGroup, criteria)
    }

    pub fn find_main_group(&self) -> Option<ObjectId> {
        self.document.main_group_id()
    }

    /// Build phase of `kind` named `comment`, preferring `target`'s own phases.
    ///
    /// # Errors
    /// - [`ProjectError::TargetNotFound`] when `target` names no native target.
    pub fn build_phase(
        &self,
        kind: SectionKind,
        comment: &str,
        target: Option<&str>,
    ) -> ProjectResult<Option<ObjectId>> {
        if let Some(target) = target {
            self.require_target(target)?;
        }
        Ok(self.document.build_phase_id(kind, comment, target))
    }

    pub fn product_name(&self) -> Option<String> {
        self.document.product_name()
    }

    /// Every id-shaped value that resolves to no record.
    pub fn unresolved_references(&self) -> Vec<DanglingReference> {
        self.document.unresolved_references()
    }

    pub(crate) fn require_target(&self, target: &str) -> ProjectResult<ObjectId> {
        self.document
            .native_target(target)
            .map(|record| record.id.clone())
            .ok_or_else(|| ProjectError::TargetNotFound(target.to_string()))
    }

    /// `target` when given and valid, else the first target.
    pub(crate) fn target_or_first(&self, target: Option<&str>) -> ProjectResult<ObjectId> {
        match target {
            Some(target) => self.require_target(target),
            None => self.document.first_target_id().ok_or(ProjectError::NoTargets),
        }
    }

    pub(crate) fn require_project_id(&self) -> ProjectResult<ObjectId> {
        self.document
            .first_project()
            .map(|record| record.id.clone())
            .ok_or(ProjectError::ProjectNotFound)
    }
}

/// `path` relative to `base`, joined with `/`; `..` climbs out of `base`.
pub(crate) fn relative_to(base: &Path, path: &Path) -> String {
    let base: Vec<Component<'_>> = base.components().filter(|c| *c != Component::CurDir).collect();
    let path: Vec<Component<'_>> = path.components().filter(|c| *c != Component::CurDir).collect();
    let common = base
        .iter()
        .zip(path.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for component in &path[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::relative_to;
    use std::path::Path;

    #[test]
    fn relative_paths_climb_with_dot_dot() {
        assert_eq!(relative_to(Path::new("/a/b"), Path::new("/a/b/c/d.m")), "c/d.m");
        assert_eq!(relative_to(Path::new("/a/b"), Path::new("/a/x.m")), "../x.m");
        assert_eq!(relative_to(Path::new("/a/b"), Path::new("/a/b")), "");
    }
}
