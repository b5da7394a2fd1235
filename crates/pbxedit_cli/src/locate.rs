//! Upward search for the project manifest.
//!
//! # Invariants
//! - Candidates are tried in fixed order at each level before moving up.
//! - Only regular files match; a directory named like a manifest is skipped.

use std::path::{Path, PathBuf};

/// Manifest locations tried relative to each searched directory.
pub const MANIFEST_CANDIDATES: [&str; 3] = [
    "project.pbxproj",
    "Runner.xcodeproj/project.pbxproj",
    "ios/Runner.xcodeproj/project.pbxproj",
];

/// First manifest found from `start` upward, if any.
pub fn locate_manifest(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        MANIFEST_CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.is_file())
    })
}
