//! Group, variant-group and known-region operations.
//!
//! # Responsibility
//! - Build a group (recursively) from a list of on-disk paths.
//! - Create, nest, and remove groups and localization variant groups.
//! - Maintain the project's `knownRegions` list.
//!
//! # Invariants
//! - A path already referenced by a file reference is reused, never duplicated.
//! - Removing a group removes its child references and their build files.

use crate::model::document::{Record, SectionKind};
use crate::model::file::{basename_of, extension_of, FileDescriptor, FileOptions};
use crate::model::file_type::{
    is_asset_catalog, is_entitlements, is_header, is_module_map, is_plist, is_source,
    DEFAULT_SOURCE_TREE,
};
use crate::model::value::{unquote, Dict, ObjectId, ObjectRef, Value};
use crate::registry::GroupCriteria;
use crate::service::project::relative_to;
use crate::service::{Project, ProjectError, ProjectResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const LOCALIZATION_DIR_EXTENSION: &str = "lproj";

/// Options for [`Project::add_pbx_group`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupOptions {
    /// Id for the new group; allocated when `None`.
    pub uuid: Option<ObjectId>,
    /// Record file paths relative to the source root and omit group paths.
    pub files_relative_to_project: bool,
    /// Target whose phases receive sources and resources.
    pub target: Option<ObjectId>,
    /// Append the new group to the main group.
    pub is_main: bool,
    /// Append the new group to the group with this display name.
    pub append_to: Option<String>,
}

/// Options for [`Project::add_localization_variant_group`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationOptions {
    pub target: Option<ObjectId>,
    pub skip_add_to_resources_group: bool,
}

/// Result of [`Project::add_pbx_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedGroup {
    pub id: ObjectId,
    /// Child entry pointing at the new group.
    pub reference: ObjectRef,
}

impl Project {
    /// Creates a group holding `paths`.
    ///
    /// # Contract
    /// - Directories other than asset catalogs become nested groups.
    /// - `*.lproj` directories become localization variant groups; each
    ///   region joins `knownRegions`.
    /// - Headers, property lists and module maps are reference-only;
    ///   entitlements set `CODE_SIGN_ENTITLEMENTS`; sources join the
    ///   `Sources` phase; `Resources`-group files join the `Resources` phase.
    ///
    /// # Errors
    /// - [`ProjectError::Io`] when a directory cannot be listed.
    /// - [`ProjectError::BuildPhaseNotFound`] when a source or resource has
    ///   no phase to join.
    /// - [`ProjectError::TargetNotFound`] for an unknown `options.target`.
    pub fn add_pbx_group<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        name: &str,
        path: Option<&str>,
        source_tree: Option<&str>,
        options: &GroupOptions,
    ) -> ProjectResult<AddedGroup> {
        let id = match &options.uuid {
            Some(id) => {
                self.document.allocated.insert(id.clone());
                id.clone()
            }
            None => self.document.allocate_id(),
        };
        let src_root = self.src_root();
        let existing = self.references_by_path();
        let group_path = path.filter(|_| !options.files_relative_to_project);

        let mut children: Vec<Value> = Vec::new();
        let mut localized: Vec<&Path> = Vec::new();

        for entry in paths {
            let entry = entry.as_ref();
            let extension = entry
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            if entry.is_dir() && extension == LOCALIZATION_DIR_EXTENSION {
                localized.push(entry);
                continue;
            }

            let recorded = if options.files_relative_to_project && entry.is_absolute() {
                relative_to(&src_root, entry)
            } else if group_path.is_some() {
                file_name(entry)
            } else {
                entry.to_string_lossy().replace('\\', "/")
            };
            if let Some(reference) = existing.get(&recorded) {
                children.push(Value::Ref(reference.clone()));
                continue;
            }

            let file_options = FileOptions {
                basename: Some(file_name(entry)),
                target: options.target.clone(),
                ..FileOptions::default()
            };
            let mut file = FileDescriptor::classify(&recorded, &file_options);

            if entry.is_dir() && !is_asset_catalog(file.kind()) {
                let nested_name = file_name(entry);
                let nested = self.add_pbx_group(
                    &sorted_entries(entry)?,
                    &nested_name,
                    Some(nested_name.as_str()),
                    None,
                    &GroupOptions {
                        files_relative_to_project: options.files_relative_to_project,
                        target: options.target.clone(),
                        ..GroupOptions::default()
                    },
                )?;
                children.push(Value::Ref(nested.reference));
                continue;
            }

            file.file_ref = Some(self.document.allocate_id());
            self.insert_file_reference(&file);
            if let Some(child) = file.group_child() {
                children.push(Value::Ref(child));
            }

            let kind = file.kind().to_string();
            if is_header(&kind) || is_plist(&kind) || is_module_map(&kind) {
                continue;
            }
            let target = options.target.as_ref().map(ObjectId::as_str);
            if is_entitlements(&kind) {
                self.add_to_build_settings(
                    "CODE_SIGN_ENTITLEMENTS",
                    file.path_or_basename(),
                    target,
                )?;
                continue;
            }
            let phase = if is_source(&kind) {
                Some(self.require_phase(SectionKind::SourcesBuildPhase, options.target.as_ref())?)
            } else if file.group_name() == "Resources" {
                Some(self.require_phase(SectionKind::ResourcesBuildPhase, options.target.as_ref())?)
            } else {
                None
            };
            if let Some(phase) = phase {
                file.uuid = Some(self.document.allocate_id());
                self.insert_build_file(&file);
                self.push_phase_entry(&phase, &file);
            }
        }

        for variant in self.localize(&localized, &src_root, options.target.as_ref())? {
            children.push(Value::Ref(variant));
        }

        let mut fields = Dict::new()
            .with("isa", SectionKind::Group.isa())
            .with("children", children)
            .with("name", name);
        if let Some(path) = group_path {
            fields.insert("path", path);
        }
        fields.insert("sourceTree", source_tree.unwrap_or(DEFAULT_SOURCE_TREE));
        self.document
            .insert_record(SectionKind::Group, Record::new(id.clone(), name, fields));

        let reference = ObjectRef::new(id.clone(), name);
        if options.is_main {
            if let Some(main) = self.document.main_group_id() {
                self.document.add_group_child(main.as_str(), reference.clone());
            }
        }
        if let Some(append_to) = &options.append_to {
            match self.document.group_key_by_name(append_to) {
                Some(parent) => {
                    self.document.add_group_child(parent.as_str(), reference.clone());
                }
                None => warn!("event=group_add module=service status=skipped reason=append_target_missing"),
            }
        }

        debug!("event=group_add module=service status=ok group={id}");
        Ok(AddedGroup { id, reference })
    }

    /// Removes the group (or variant group) named `name`. Returns whether
    /// one was found.
    pub fn remove_pbx_group(&mut self, name: &str) -> bool {
        let criteria = GroupCriteria::name(name);
        let key = self
            .document
            .find_group_key(SectionKind::Group, &criteria)
            .or_else(|| self.document.find_group_key(SectionKind::VariantGroup, &criteria));
        match key {
            Some(key) => self.remove_pbx_group_by_key(key.as_str()),
            None => false,
        }
    }

    /// Removes a group, its nested groups, its child references and the
    /// build files pointing at any of them.
    pub fn remove_pbx_group_by_key(&mut self, key: &str) -> bool {
        let kind = if self.document.record(SectionKind::Group, key).is_some() {
            SectionKind::Group
        } else if self.document.record(SectionKind::VariantGroup, key).is_some() {
            SectionKind::VariantGroup
        } else if self.document.record(SectionKind::VersionGroup, key).is_some() {
            SectionKind::VersionGroup
        } else {
            return false;
        };

        let children = match kind {
            SectionKind::VersionGroup => self
                .document
                .record(kind, key)
                .and_then(|record| record.fields.get_array("children"))
                .map(|children| children.iter().filter_map(Value::as_str).map(ObjectId::from).collect())
                .unwrap_or_default(),
            _ => self.document.group_children(key),
        };
        for child in &children {
            self.remove_pbx_group_by_key(child.as_str());
            self.document
                .remove_record(SectionKind::FileReference, child.as_str());
            self.remove_build_files_for(child.as_str());
        }
        self.remove_build_files_for(key);

        self.document.unlink_from_all_groups(key);
        self.document.remove_record(kind, key);
        debug!("event=group_remove module=service status=ok group={key} children={}", children.len());
        true
    }

    /// Creates an empty group and returns its id.
    pub fn create_group(&mut self, name: &str, path: Option<&str>) -> ObjectId {
        self.document.create_group_record(SectionKind::Group, name, path)
    }

    /// Creates an empty variant group and returns its id.
    pub fn create_variant_group(&mut self, name: &str) -> ObjectId {
        self.document
            .create_group_record(SectionKind::VariantGroup, name, None)
    }

    /// Appends `child` to the group or variant group `group`.
    pub fn add_to_group(&mut self, child: ObjectRef, group: &str) -> ProjectResult<()> {
        if self.document.add_group_child(group, child) {
            Ok(())
        } else {
            Err(ProjectError::GroupNotFound(group.to_string()))
        }
    }

    /// Nests the group `child_key` inside `group`.
    ///
    /// # Errors
    /// - [`ProjectError::GroupNotFound`] when either key is no group.
    pub fn add_group_to_group(&mut self, child_key: &str, group: &str) -> ProjectResult<()> {
        let comment = self
            .document
            .record(SectionKind::Group, child_key)
            .or_else(|| self.document.record(SectionKind::VariantGroup, child_key))
            .map(|record| {
                record
                    .get_str("name")
                    .map(|name| unquote(name).to_string())
                    .or_else(|| record.comment().map(str::to_string))
                    .unwrap_or_default()
            })
            .ok_or_else(|| ProjectError::GroupNotFound(child_key.to_string()))?;
        self.add_to_group(ObjectRef::new(child_key, comment), group)
    }

    pub fn remove_from_group(&mut self, child: &ObjectRef, group: &str) -> bool {
        self.document.remove_group_child(group, child)
    }

    /// Creates a variant group named `name`, plus its build file in the
    /// `Resources` phase.
    ///
    /// # Errors
    /// - [`ProjectError::BuildPhaseNotFound`] when no `Resources` phase exists.
    pub fn add_localization_variant_group(
        &mut self,
        name: &str,
        options: &LocalizationOptions,
    ) -> ProjectResult<FileDescriptor> {
        let phase = self.require_phase(SectionKind::ResourcesBuildPhase, options.target.as_ref())?;
        let key = self.create_variant_group(name);

        if !options.skip_add_to_resources_group {
            match self.document.group_key_by_name("Resources") {
                Some(resources) => {
                    self.document
                        .add_group_child(resources.as_str(), ObjectRef::new(key.clone(), name));
                }
                None => warn!("event=variant_group_add module=service status=skipped reason=resources_group_missing"),
            }
        }

        let file = FileDescriptor {
            basename: name.to_string(),
            group: Some("Resources".to_string()),
            source_tree: DEFAULT_SOURCE_TREE.to_string(),
            target: options.target.clone(),
            file_ref: Some(key),
            uuid: Some(self.document.allocate_id()),
            ..FileDescriptor::default()
        };
        self.insert_build_file(&file);
        self.push_phase_entry(&phase, &file);
        debug!(
            "event=variant_group_add module=service status=ok group={}",
            file.file_ref.as_ref().map(ObjectId::as_str).unwrap_or("none")
        );
        Ok(file)
    }

    /// Appends `region` to `knownRegions` unless present.
    pub fn add_known_region(&mut self, region: &str) -> ProjectResult<()> {
        let project = self
            .document
            .first_project_mut()
            .ok_or(ProjectError::ProjectNotFound)?;
        let regions = project.fields.entry_array("knownRegions");
        if !regions.iter().any(|existing| existing.is_str(region)) {
            regions.push(Value::from(region));
        }
        Ok(())
    }

    /// Removes the first `knownRegions` entry equal to `region`.
    pub fn remove_known_region(&mut self, region: &str) -> bool {
        let Some(regions) = self
            .document
            .first_project_mut()
            .and_then(|project| project.fields.get_array_mut("knownRegions"))
        else {
            return false;
        };
        match regions.iter().position(|existing| existing.is_str(region)) {
            Some(index) => {
                regions.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_known_region(&self, region: &str) -> bool {
        self.document
            .first_project()
            .and_then(|project| project.fields.get_array("knownRegions"))
            .is_some_and(|regions| regions.iter().any(|existing| existing.is_str(region)))
    }

    /// Turns `*.lproj` directories into one variant group per localized
    /// file name and returns the group entries.
    fn localize(
        &mut self,
        lproj_dirs: &[&Path],
        src_root: &Path,
        target: Option<&ObjectId>,
    ) -> ProjectResult<Vec<ObjectRef>> {
        // file stem -> (region, full path)
        let mut variants: BTreeMap<String, Vec<(String, PathBuf)>> = BTreeMap::new();
        let mut storyboards: Vec<String> = Vec::new();

        for dir in lproj_dirs {
            let region = dir
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.add_known_region(&region)?;
            for file in sorted_entries(dir)? {
                let name = file_name(&file);
                let stem = match name.rfind('.') {
                    Some(index) if index > 0 => name[..index].to_string(),
                    _ => name.clone(),
                };
                if extension_of(&name) == "storyboard" && !storyboards.contains(&stem) {
                    storyboards.push(stem.clone());
                }
                variants.entry(stem).or_default().push((region.clone(), file));
            }
        }

        let mut references = Vec::with_capacity(variants.len());
        for (stem, regions) in variants {
            let suffix = if storyboards.contains(&stem) {
                "storyboard"
            } else {
                "strings"
            };
            let group = self.add_localization_variant_group(
                &format!("{stem}.{suffix}"),
                &LocalizationOptions {
                    target: target.cloned(),
                    skip_add_to_resources_group: true,
                },
            )?;
            let (Some(group_key), Some(group_ref)) = (group.file_ref.clone(), group.group_child()) else {
                continue;
            };
            for (region, path) in regions {
                let recorded = if path.is_absolute() {
                    relative_to(src_root, &path)
                } else {
                    path.to_string_lossy().replace('\\', "/")
                };
                let mut file = FileDescriptor::classify(
                    &recorded,
                    &FileOptions {
                        basename: Some(region),
                        ..FileOptions::default()
                    },
                );
                file.file_ref = Some(self.document.allocate_id());
                self.insert_file_reference(&file);
                if let Some(child) = file.group_child() {
                    self.document.add_group_child(group_key.as_str(), child);
                }
            }
            references.push(group_ref);
        }
        Ok(references)
    }

    /// Existing file references keyed by unquoted path.
    fn references_by_path(&self) -> HashMap<String, ObjectRef> {
        self.document
            .records(SectionKind::FileReference)
            .filter_map(|record| {
                let path = record.get_str("path")?;
                let comment = record.comment().unwrap_or(basename_of(path));
                Some((
                    unquote(path).to_string(),
                    ObjectRef::new(record.id.clone(), comment),
                ))
            })
            .collect()
    }

    /// Deletes the build files whose `fileRef` is `file_ref` and strips them
    /// from every phase.
    pub(crate) fn remove_build_files_for(&mut self, file_ref: &str) {
        for id in self.document.build_files_referencing(file_ref) {
            self.document.remove_record(SectionKind::BuildFile, id.as_str());
            self.document.remove_build_file_from_phases(id.as_str());
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn sorted_entries(dir: &Path) -> ProjectResult<Vec<PathBuf>> {
    let io_error = |source| ProjectError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        entries.push(entry.map_err(io_error)?.path());
    }
    entries.sort();
    Ok(entries)
}
