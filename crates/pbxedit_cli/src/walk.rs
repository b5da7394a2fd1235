//! Breadth-first folder walk feeding the `add` command.
//!
//! # Invariants
//! - Entries of one directory are visited in name order.
//! - A directory's files come before the contents of its subdirectories;
//!   subdirectories are expanded in the order they were reached.
//! - Every folder is reported before any entry inside it.
//! - Symlinked directories are skipped; symlinked files are reported.

use log::debug;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

/// One visited entry below the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEntry {
    Folder {
        path: PathBuf,
        /// Directory containing this folder.
        parent: PathBuf,
    },
    File {
        path: PathBuf,
        /// Directory containing this file.
        parent: PathBuf,
    },
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        match self {
            Self::Folder { path, .. } | Self::File { path, .. } => path,
        }
    }

    pub fn parent(&self) -> &Path {
        match self {
            Self::Folder { parent, .. } | Self::File { parent, .. } => parent,
        }
    }

    /// Final path component.
    pub fn name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension without the dot, empty when there is none.
    pub fn extension(&self) -> String {
        self.path()
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists everything below `root` (excluding `root` itself).
pub fn walk(root: &Path) -> io::Result<Vec<WalkEntry>> {
    let mut queue: VecDeque<PathBuf> = sorted_entries(root)?.into();
    let mut visited = Vec::new();

    while let Some(path) = queue.pop_front() {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let metadata = std::fs::symlink_metadata(&path)?;
        if metadata.file_type().is_symlink() && path.is_dir() {
            debug!("event=walk_entry module=cli status=skipped reason=symlinked_dir");
            continue;
        }
        if metadata.is_dir() {
            queue.extend(sorted_entries(&path)?);
            visited.push(WalkEntry::Folder { path, parent });
        } else {
            visited.push(WalkEntry::File { path, parent });
        }
    }
    Ok(visited)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
