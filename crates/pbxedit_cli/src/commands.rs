//! Bodies of the `search` and `add` subcommands.
//!
//! # Responsibility
//! - Report the manifest the CLI would edit.
//! - Mirror a folder tree into the project as nested groups.
//!
//! # Invariants
//! - Each walked folder becomes a group nested in its parent folder's group.
//! - Storyboards go through the resource add-operation, every other file
//!   through the source add-operation.

use crate::error::{CliError, CliResult};
use crate::locate::locate_manifest;
use crate::walk::{walk, WalkEntry};
use log::{debug, info};
use pbxedit_core::{FileOptions, GroupOptions, ObjectId, Project};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const RESOURCE_EXTENSIONS: [&str; 1] = ["storyboard"];

/// Output of `pbxedit search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    #[serde(rename = "pbxprojFile")]
    pub pbxproj_file: Option<PathBuf>,
}

/// Counts reported by [`add_folder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddSummary {
    pub groups: usize,
    pub sources: usize,
    pub resources: usize,
    /// Files whose path the project already referenced.
    pub skipped: usize,
}

pub fn search(cwd: &Path) -> SearchReport {
    SearchReport {
        pbxproj_file: locate_manifest(cwd),
    }
}

/// Adds `folder` as a group appended to the group named `append_to`, then
/// adds everything below it.
///
/// # Errors
/// - [`CliError::NotADirectory`] when `folder` is no directory.
/// - [`CliError::Io`] when the folder cannot be walked.
/// - [`CliError::Project`] when an add-operation fails.
pub fn add_folder(project: &mut Project, folder: &Path, append_to: &str) -> CliResult<AddSummary> {
    if !folder.is_dir() {
        return Err(CliError::NotADirectory(folder.to_path_buf()));
    }
    let entries = walk(folder).map_err(|source| CliError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let name = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let root = project.add_pbx_group::<&Path>(
        &[],
        &name,
        Some(&name),
        None,
        &GroupOptions {
            append_to: Some(append_to.to_string()),
            ..GroupOptions::default()
        },
    )?;

    let mut groups: HashMap<PathBuf, ObjectId> = HashMap::new();
    groups.insert(folder.to_path_buf(), root.id);
    let mut summary = AddSummary {
        groups: 1,
        ..AddSummary::default()
    };

    for entry in &entries {
        let Some(parent) = groups.get(entry.parent()).cloned() else {
            debug!("event=walk_entry module=cli status=skipped reason=parent_group_missing");
            continue;
        };
        let entry_name = entry.name();
        match entry {
            WalkEntry::Folder { path, .. } => {
                let group = project.add_pbx_group::<&Path>(
                    &[],
                    &entry_name,
                    Some(&entry_name),
                    None,
                    &GroupOptions::default(),
                )?;
                project.add_group_to_group(group.id.as_str(), parent.as_str())?;
                groups.insert(path.clone(), group.id);
                summary.groups += 1;
            }
            WalkEntry::File { .. } => {
                let options = FileOptions::default();
                let resource = RESOURCE_EXTENSIONS.contains(&entry.extension().as_str());
                let added = if resource {
                    project.add_resource_file(&entry_name, &options, Some(parent.as_str()))?
                } else {
                    project.add_source_file(&entry_name, &options, Some(parent.as_str()))?
                };
                match (added, resource) {
                    (None, _) => summary.skipped += 1,
                    (Some(_), true) => summary.resources += 1,
                    (Some(_), false) => summary.sources += 1,
                }
            }
        }
    }

    info!(
        "event=folder_add module=cli status=ok groups={} sources={} resources={} skipped={}",
        summary.groups, summary.sources, summary.resources, summary.skipped
    );
    Ok(summary)
}
