//! File, framework, library and data-model operations.
//!
//! # Responsibility
//! - Classify a path, then write its file reference, build file, phase entry
//!   and group membership as one call.
//! - Undo exactly those records on removal.
//!
//! # Invariants
//! - A duplicate on-disk path never produces a second file reference; the
//!   per-operation result for duplicates is documented on each method.
//! - Required build phases are resolved before the first record is written.
//! - Removing an absent file is a no-op returning a descriptor without ids.

use crate::model::document::{Record, SectionKind};
use crate::model::file::{dirname_of, extension_of, DataModelDescriptor, FileDescriptor, FileOptions};
use crate::model::file_type::{DATA_MODEL, DEFAULT_SOURCE_TREE};
use crate::model::target::{CopyDestination, PhaseSpec};
use crate::model::value::{unquote, Dict, ObjectId, ObjectRef, Value};
use crate::registry::GroupCriteria;
use crate::service::project::relative_to;
use crate::service::{Project, ProjectError, ProjectResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static CURRENT_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<key>_XCCurrentVersionName</key>\s*<string>([^<]+)</string>")
        .expect("valid current version regex")
});

const CURRENT_VERSION_FILE: &str = ".xccurrentversion";
const EMBED_FRAMEWORKS: &str = "Embed Frameworks";

/// Input for search-path edits.
#[derive(Debug, Clone, Copy)]
pub enum SearchPathSource<'a> {
    /// Derive the entry from a classified file's location.
    File(&'a FileDescriptor),
    /// A directory; absolute paths are made relative to the source root.
    Path(&'a str),
}

impl Project {
    /// Adds a reference-only file to the `Plugins` group.
    ///
    /// Returns `None` when a reference with the same path exists.
    pub fn add_plugin_file(&mut self, path: &str, options: &FileOptions) -> Option<FileDescriptor> {
        let mut file = FileDescriptor::classify(path, options);
        file.plugin = true;
        self.correct_for_group_path(&mut file, "Plugins");

        if self.has_file(file.path_or_basename()).is_some() {
            return None;
        }

        file.file_ref = Some(self.document.allocate_id());
        self.insert_file_reference(&file);
        self.link_to_well_known_group("Plugins", &file);
        debug!(
            "event=file_add module=service status=ok kind=plugin file_ref={}",
            id_label(&file.file_ref)
        );
        Some(file)
    }

    pub fn remove_plugin_file(&mut self, path: &str, options: &FileOptions) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        file.plugin = true;
        self.correct_for_group_path(&mut file, "Plugins");
        self.remove_file_reference(&mut file);
        file
    }

    /// Adds a build-product reference to the `Products` group. Always
    /// creates a new reference; the build file id is reserved but not written.
    pub fn add_product_file(&mut self, path: &str, options: &FileOptions) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        file.file_ref = Some(self.document.allocate_id());
        file.uuid = Some(self.document.allocate_id());
        file.path = Some(file.basename.clone());
        file.group = options.group.clone();
        file.target = options.target.clone();

        self.insert_file_reference(&file);
        self.link_to_well_known_group("Products", &file);
        debug!(
            "event=file_add module=service status=ok kind=product file_ref={}",
            id_label(&file.file_ref)
        );
        file
    }

    /// Unlinks a product reference from the `Products` group only.
    pub fn remove_product_file(&mut self, path: &str, options: &FileOptions) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        file.file_ref = self.file_key(&file.basename);
        if let (Some(group), Some(child)) = (self.document.group_key_by_name("Products"), file.group_child()) {
            self.document.remove_group_child(group.as_str(), &child);
        }
        file
    }

    /// Adds a compiled source: reference, build file and `Sources` entry.
    ///
    /// Without `group` the file goes through [`Project::add_plugin_file`].
    /// Returns `None` for a duplicate path.
    ///
    /// # Errors
    /// - [`ProjectError::TargetNotFound`] for an unknown `options.target`.
    /// - [`ProjectError::BuildPhaseNotFound`] when no `Sources` phase exists.
    /// - [`ProjectError::GroupNotFound`] for an unknown `group`.
    pub fn add_source_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> ProjectResult<Option<FileDescriptor>> {
        let phase = self.require_phase(SectionKind::SourcesBuildPhase, options.target.as_ref())?;
        let file = match group {
            Some(group) => self.add_file(path, group, options)?,
            None => self.add_plugin_file(path, options),
        };
        let Some(mut file) = file else {
            return Ok(None);
        };

        file.target = options.target.clone();
        file.uuid = Some(self.document.allocate_id());
        self.insert_build_file(&file);
        self.push_phase_entry(&phase, &file);
        debug!(
            "event=file_add module=service status=ok kind=source file_ref={} build_file={}",
            id_label(&file.file_ref),
            id_label(&file.uuid)
        );
        Ok(Some(file))
    }

    pub fn remove_source_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> FileDescriptor {
        let mut file = match group {
            Some(group) => self.remove_file(path, group, options),
            None => self.remove_plugin_file(path, options),
        };
        file.target = options.target.clone();
        self.remove_build_files(&mut file, SectionKind::SourcesBuildPhase);
        debug!(
            "event=file_remove module=service status=ok kind=source file_ref={}",
            id_label(&file.file_ref)
        );
        file
    }

    /// Adds a reference-only header. Returns `None` for a duplicate path.
    pub fn add_header_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> ProjectResult<Option<FileDescriptor>> {
        match group {
            Some(group) => self.add_file(path, group, options),
            None => Ok(self.add_plugin_file(path, options)),
        }
    }

    pub fn remove_header_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> FileDescriptor {
        match group {
            Some(group) => self.remove_file(path, group, options),
            None => self.remove_plugin_file(path, options),
        }
    }

    /// Adds a resource: reference, build file and `Resources` entry.
    ///
    /// The reference joins `group` (plain or variant) when given, the
    /// `Resources` group otherwise. With `options.variant_group` no build
    /// file is written. Returns `None` for a duplicate path.
    pub fn add_resource_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> ProjectResult<Option<FileDescriptor>> {
        let phase = if options.variant_group {
            None
        } else {
            Some(self.require_phase(SectionKind::ResourcesBuildPhase, options.target.as_ref())?)
        };
        if let Some(group) = group {
            self.require_group(group)?;
        }

        let mut file = if options.plugin {
            match self.add_plugin_file(path, options) {
                Some(file) => file,
                None => return Ok(None),
            }
        } else {
            let mut file = FileDescriptor::classify(path, options);
            self.correct_for_group_path(&mut file, "Resources");
            if self.has_file(file.path_or_basename()).is_some() {
                return Ok(None);
            }
            file.file_ref = Some(self.document.allocate_id());
            file
        };
        file.target = options.target.clone();

        if let Some(phase) = &phase {
            file.uuid = Some(self.document.allocate_id());
            self.insert_build_file(&file);
            self.push_phase_entry(phase, &file);
        }

        if !options.plugin {
            self.insert_file_reference(&file);
            match (group, file.group_child()) {
                (Some(group), Some(child)) => {
                    self.document.add_group_child(group, child);
                }
                _ => self.link_to_well_known_group("Resources", &file),
            }
        }
        debug!(
            "event=file_add module=service status=ok kind=resource file_ref={} build_file={}",
            id_label(&file.file_ref),
            id_label(&file.uuid)
        );
        Ok(Some(file))
    }

    pub fn remove_resource_file(
        &mut self,
        path: &str,
        options: &FileOptions,
        group: Option<&str>,
    ) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        file.target = options.target.clone();
        self.correct_for_group_path(&mut file, "Resources");
        self.remove_file_reference(&mut file);
        self.remove_build_files(&mut file, SectionKind::ResourcesBuildPhase);
        if group.is_none() {
            if let (Some(resources), Some(child)) =
                (self.document.group_key_by_name("Resources"), file.group_child())
            {
                self.document.remove_group_child(resources.as_str(), &child);
            }
        }
        debug!(
            "event=file_remove module=service status=ok kind=resource file_ref={}",
            id_label(&file.file_ref)
        );
        file
    }

    /// Adds a framework, linking it unless `options.link == Some(false)`.
    ///
    /// An existing reference with the same path is reused, as is an existing
    /// build file for it in the `Frameworks` phase. A custom framework gains
    /// a framework search path; with `embed` it also gets a second build file
    /// in the `Embed Frameworks` copy phase, created when missing, and the
    /// embedded descriptor is returned.
    ///
    /// # Errors
    /// - [`ProjectError::TargetNotFound`] for an unknown `options.target`.
    pub fn add_framework(&mut self, path: &str, options: &FileOptions) -> ProjectResult<FileDescriptor> {
        if let Some(target) = &options.target {
            self.require_target(target.as_str())?;
        }
        let link = options.link.unwrap_or(true);
        let linked_options = FileOptions {
            embed: false,
            ..options.clone()
        };

        let mut file = FileDescriptor::classify(path, &linked_options);
        file.target = options.target.clone();

        match self.file_key(file.path_or_basename()) {
            Some(existing) => file.file_ref = Some(existing),
            None => {
                file.file_ref = Some(self.document.allocate_id());
                self.insert_file_reference(&file);
                self.link_to_well_known_group("Frameworks", &file);
            }
        }

        if link {
            let target = options.target.as_ref().map(ObjectId::as_str);
            if let Some(phase) = self
                .document
                .build_phase_id(SectionKind::FrameworksBuildPhase, "Frameworks", target)
            {
                self.attach_build_file(&phase, &mut file);
            }
        }

        if options.custom_framework {
            self.add_to_framework_search_paths(SearchPathSource::File(&file));

            if options.embed {
                let mut embedded = FileDescriptor::classify(path, options);
                embedded.file_ref = file.file_ref.clone();
                embedded.target = file.target.clone();
                if let Some(phase) = self.embed_frameworks_phase(options.target.as_ref()) {
                    self.attach_build_file(&phase, &mut embedded);
                }
                debug!(
                    "event=framework_add module=service status=ok embed=true file_ref={} build_file={}",
                    id_label(&embedded.file_ref),
                    id_label(&embedded.uuid)
                );
                return Ok(embedded);
            }
        }

        debug!(
            "event=framework_add module=service status=ok embed=false file_ref={} build_file={}",
            id_label(&file.file_ref),
            id_label(&file.uuid)
        );
        Ok(file)
    }

    /// Removes a framework's reference, every build file pointing at it,
    /// its embed entry and, for custom frameworks, its search path.
    pub fn remove_framework(&mut self, path: &str, options: &FileOptions) -> FileDescriptor {
        let linked_options = FileOptions {
            embed: false,
            ..options.clone()
        };
        let mut file = FileDescriptor::classify(path, &linked_options);
        file.target = options.target.clone();

        self.remove_file_reference(&mut file);
        self.remove_build_files(&mut file, SectionKind::FrameworksBuildPhase);

        if options.custom_framework {
            self.remove_from_framework_search_paths(SearchPathSource::File(&file));
        }

        let embedded = FileDescriptor::classify(
            path,
            &FileOptions {
                embed: true,
                ..options.clone()
            },
        );
        let target = options.target.as_ref().map(ObjectId::as_str);
        if let Some(phase) = self.document.build_phase_id(
            SectionKind::CopyFilesBuildPhase,
            EMBED_FRAMEWORKS,
            target,
        ) {
            self.document
                .remove_phase_entry_by_comment(phase.as_str(), &embedded.long_comment());
        }
        debug!(
            "event=framework_remove module=service status=ok file_ref={}",
            id_label(&file.file_ref)
        );
        file
    }

    /// Adds a file to the `Copy Files` phase. An existing reference with the
    /// same path is reused; a new build file is always written.
    pub fn add_copy_file(&mut self, path: &str, options: &FileOptions) -> ProjectResult<FileDescriptor> {
        let phase = self.require_named_phase(
            SectionKind::CopyFilesBuildPhase,
            "Copy Files",
            options.target.as_ref(),
        )?;
        let mut file = FileDescriptor::classify(path, options);
        file.target = options.target.clone();

        match self.file_key(file.path_or_basename()) {
            Some(existing) => file.file_ref = Some(existing),
            None => {
                file.file_ref = Some(self.document.allocate_id());
                self.insert_file_reference(&file);
            }
        }
        file.uuid = Some(self.document.allocate_id());
        self.insert_build_file(&file);
        self.push_phase_entry(&phase, &file);
        debug!(
            "event=file_add module=service status=ok kind=copy file_ref={} build_file={}",
            id_label(&file.file_ref),
            id_label(&file.uuid)
        );
        Ok(file)
    }

    pub fn remove_copy_file(&mut self, path: &str, options: &FileOptions) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        file.target = options.target.clone();
        self.remove_file_reference(&mut file);
        self.remove_build_files(&mut file, SectionKind::CopyFilesBuildPhase);
        file
    }

    /// Adds a static library to the `Frameworks` phase plus a library search
    /// path. Returns `None` for a duplicate path.
    pub fn add_static_library(
        &mut self,
        path: &str,
        options: &FileOptions,
    ) -> ProjectResult<Option<FileDescriptor>> {
        let phase = self.require_phase(SectionKind::FrameworksBuildPhase, options.target.as_ref())?;

        let mut file = if options.plugin {
            match self.add_plugin_file(path, options) {
                Some(file) => file,
                None => return Ok(None),
            }
        } else {
            let mut file = FileDescriptor::classify(path, options);
            if self.has_file(file.path_or_basename()).is_some() {
                return Ok(None);
            }
            file.file_ref = Some(self.document.allocate_id());
            self.insert_file_reference(&file);
            file
        };

        file.target = options.target.clone();
        file.uuid = Some(self.document.allocate_id());
        self.insert_build_file(&file);
        self.push_phase_entry(&phase, &file);
        self.add_to_library_search_paths(SearchPathSource::File(&file));
        debug!(
            "event=file_add module=service status=ok kind=static_library file_ref={} build_file={}",
            id_label(&file.file_ref),
            id_label(&file.uuid)
        );
        Ok(Some(file))
    }

    /// Adds a reference-only file to the group or variant group `group`.
    /// Returns `None` for a duplicate path.
    ///
    /// # Errors
    /// - [`ProjectError::GroupNotFound`] when `group` is no group key.
    pub fn add_file(
        &mut self,
        path: &str,
        group: &str,
        options: &FileOptions,
    ) -> ProjectResult<Option<FileDescriptor>> {
        self.require_group(group)?;
        let mut file = FileDescriptor::classify(path, options);
        if self.has_file(file.path_or_basename()).is_some() {
            return Ok(None);
        }

        file.file_ref = Some(self.document.allocate_id());
        self.insert_file_reference(&file);
        if let Some(child) = file.group_child() {
            self.document.add_group_child(group, child);
        }
        Ok(Some(file))
    }

    pub fn remove_file(&mut self, path: &str, group: &str, options: &FileOptions) -> FileDescriptor {
        let mut file = FileDescriptor::classify(path, options);
        self.remove_file_reference(&mut file);
        if let Some(child) = file.group_child() {
            self.document.remove_group_child(group, &child);
        }
        file
    }

    /// Adds a versioned data-model bundle: a version group listing every
    /// model inside `path`, a build file and a `Sources` entry.
    ///
    /// The bundle joins `group` (key or name, `Resources` by default). The
    /// current version comes from `.xccurrentversion`, else the first model.
    /// Returns `None` for a duplicate path.
    ///
    /// # Errors
    /// - [`ProjectError::GroupNotFound`] when the group cannot be resolved.
    /// - [`ProjectError::Io`] when the bundle directory cannot be read.
    /// - [`ProjectError::InvalidDataModel`] when it holds no models.
    pub fn add_data_model_document(
        &mut self,
        path: &str,
        group: Option<&str>,
        options: &FileOptions,
    ) -> ProjectResult<Option<DataModelDescriptor>> {
        let group_name = group.unwrap_or("Resources");
        let group_id = self.resolve_group_key_or_name(group_name)?;

        let mut file = FileDescriptor::classify(path, options);
        let recorded = file.path_or_basename();
        let duplicate = self.has_file(recorded).is_some()
            || self
                .document
                .records(SectionKind::VersionGroup)
                .any(|record| record.fields.get("path").is_some_and(|value| value.is_str(recorded)));
        if duplicate {
            return Ok(None);
        }
        let phase = self.require_phase(SectionKind::SourcesBuildPhase, options.target.as_ref())?;
        let (model_names, current_name) = read_data_model(Path::new(path))?;
        if model_names.is_empty() {
            return Err(ProjectError::InvalidDataModel(PathBuf::from(path)));
        }

        file.target = options.target.clone();
        file.file_ref = Some(self.document.allocate_id());
        if let Some(child) = file.group_child() {
            self.document.add_group_child(group_id.as_str(), child);
        }
        file.uuid = Some(self.document.allocate_id());
        self.insert_build_file(&file);
        self.push_phase_entry(&phase, &file);

        let mut models = Vec::with_capacity(model_names.len());
        for name in &model_names {
            let mut model = FileDescriptor::classify(name, &FileOptions::default());
            model.file_ref = Some(self.document.allocate_id());
            self.insert_file_reference(&model);
            models.push(model);
        }
        let current = current_name
            .as_deref()
            .and_then(|name| models.iter().position(|model| model.basename == name))
            .unwrap_or(0);
        let current_model = models[current].file_ref.clone();

        let children: Vec<Value> = models
            .iter()
            .filter_map(FileDescriptor::group_child)
            .map(Value::Ref)
            .collect();
        let mut fields = Dict::new()
            .with("isa", SectionKind::VersionGroup.isa())
            .with("children", children);
        if let Some(current) = models[current].group_child() {
            fields.insert("currentVersion", current);
        }
        fields.insert("name", file.basename.as_str());
        fields.insert("path", file.path_or_basename());
        fields.insert("sourceTree", DEFAULT_SOURCE_TREE);
        fields.insert("versionGroupType", DATA_MODEL);
        if let Some(id) = &file.file_ref {
            self.document.insert_record(
                SectionKind::VersionGroup,
                Record::new(id.clone(), file.basename.as_str(), fields),
            );
        }
        debug!(
            "event=data_model_add module=service status=ok version_group={} models={}",
            id_label(&file.file_ref),
            models.len()
        );
        Ok(Some(DataModelDescriptor {
            file,
            models,
            current_model,
        }))
    }

    /// Appends a framework search path to every configuration building the
    /// inferred product.
    pub fn add_to_framework_search_paths(&mut self, source: SearchPathSource<'_>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.append_to_list_setting("FRAMEWORK_SEARCH_PATHS", &entry, None);
        }
    }

    pub fn remove_from_framework_search_paths(&mut self, source: SearchPathSource<'_>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.remove_from_list_setting("FRAMEWORK_SEARCH_PATHS", &entry);
        }
    }

    pub fn add_to_library_search_paths(&mut self, source: SearchPathSource<'_>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.append_to_list_setting("LIBRARY_SEARCH_PATHS", &entry, None);
        }
    }

    pub fn remove_from_library_search_paths(&mut self, source: SearchPathSource<'_>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.remove_from_list_setting("LIBRARY_SEARCH_PATHS", &entry);
        }
    }

    /// Appends a header search path to configurations building
    /// `product_name`, or the inferred product when `None`.
    pub fn add_to_header_search_paths(&mut self, source: SearchPathSource<'_>, product_name: Option<&str>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.append_to_list_setting("HEADER_SEARCH_PATHS", &entry, product_name);
        }
    }

    pub fn remove_from_header_search_paths(&mut self, source: SearchPathSource<'_>) {
        if let Some(entry) = self.search_path_entry(source) {
            self.remove_from_list_setting("HEADER_SEARCH_PATHS", &entry);
        }
    }

    /// `$(SRCROOT)`-relative entry for `source`; `None` when it
    /// depends on a product name the project does not declare.
    fn search_path_entry(&self, source: SearchPathSource<'_>) -> Option<String> {
        let file = match source {
            SearchPathSource::Path(path) => {
                let relative = if Path::new(path).is_absolute() {
                    relative_to(&self.src_root(), Path::new(path))
                } else {
                    path.to_string()
                };
                return Some(srcroot_entry(&relative));
            }
            SearchPathSource::File(file) => file,
        };

        let plugins_path = self
            .document
            .group_by_name("Plugins")
            .and_then(|group| group.get_str("path"));
        if let (true, Some(plugins_path)) = (file.plugin, plugins_path) {
            return Some(srcroot_entry(unquote(plugins_path)));
        }
        if file.custom_framework {
            if let Some(dirname) = &file.dirname {
                return Some(dirname.clone());
            }
        }

        let product = self.document.product_name()?;
        let dir = dirname_of(file.path_or_basename());
        if dir == "." {
            Some(srcroot_entry(&product))
        } else {
            Some(srcroot_entry(&format!("{product}/{dir}")))
        }
    }

    pub(crate) fn insert_file_reference(&mut self, file: &FileDescriptor) {
        if let Some(id) = &file.file_ref {
            self.document.insert_record(
                SectionKind::FileReference,
                Record::new(id.clone(), file.basename.as_str(), file.file_reference_fields()),
            );
        }
    }

    pub(crate) fn insert_build_file(&mut self, file: &FileDescriptor) {
        if let (Some(id), Some(fields)) = (&file.uuid, file.build_file_fields()) {
            self.document.insert_record(
                SectionKind::BuildFile,
                Record::new(id.clone(), file.long_comment(), fields),
            );
        }
    }

    pub(crate) fn push_phase_entry(&mut self, phase: &ObjectId, file: &FileDescriptor) {
        if let Some(entry) = file.phase_entry() {
            self.document.push_phase_entry(phase.as_str(), entry);
        }
    }

    /// Reuses the phase's build file for `file.file_ref`, or writes one.
    fn attach_build_file(&mut self, phase: &ObjectId, file: &mut FileDescriptor) {
        let existing = file
            .file_ref
            .as_ref()
            .and_then(|file_ref| self.document.phase_build_file_for(phase.as_str(), file_ref.as_str()));
        match existing {
            Some(existing) => file.uuid = Some(existing),
            None => {
                file.uuid = Some(self.document.allocate_id());
                self.insert_build_file(file);
                self.push_phase_entry(phase, file);
            }
        }
    }

    /// The `Embed Frameworks` copy phase of `target` (or the first target),
    /// created when missing. `None` when the project has no target.
    fn embed_frameworks_phase(&mut self, target: Option<&ObjectId>) -> Option<ObjectId> {
        let owner = match target {
            Some(target) => target.clone(),
            None => self.document.first_target_id()?,
        };
        if let Some(phase) = self.document.build_phase_id(
            SectionKind::CopyFilesBuildPhase,
            EMBED_FRAMEWORKS,
            Some(owner.as_str()),
        ) {
            return Some(phase);
        }
        let spec = PhaseSpec::CopyFiles {
            destination: CopyDestination::Frameworks,
            dst_path: String::new(),
        };
        self.add_build_phase(&[], &spec, EMBED_FRAMEWORKS, Some(owner.as_str()))
            .ok()
    }

    /// Default phase of `kind` for `target`.
    pub(crate) fn require_phase(
        &self,
        kind: SectionKind,
        target: Option<&ObjectId>,
    ) -> ProjectResult<ObjectId> {
        let name = kind.default_phase_name().unwrap_or_else(|| kind.isa());
        self.require_named_phase(kind, name, target)
    }

    pub(crate) fn require_named_phase(
        &self,
        kind: SectionKind,
        name: &str,
        target: Option<&ObjectId>,
    ) -> ProjectResult<ObjectId> {
        let target_key = target.map(ObjectId::as_str);
        self.build_phase(kind, name, target_key)?
            .ok_or_else(|| ProjectError::BuildPhaseNotFound {
                phase: name.to_string(),
                target: target.cloned(),
            })
    }

    pub(crate) fn require_group(&self, group: &str) -> ProjectResult<()> {
        let known = self.document.record(SectionKind::Group, group).is_some()
            || self.document.record(SectionKind::VariantGroup, group).is_some();
        if known {
            Ok(())
        } else {
            Err(ProjectError::GroupNotFound(group.to_string()))
        }
    }

    /// A `PBXGroup` key as given, else the group whose `name` is `group`.
    fn resolve_group_key_or_name(&self, group: &str) -> ProjectResult<ObjectId> {
        if self.document.record(SectionKind::Group, group).is_some() {
            return Ok(ObjectId::from(group));
        }
        self.document
            .find_group_key(SectionKind::Group, &GroupCriteria::name(group))
            .or_else(|| self.document.group_key_by_name(group))
            .ok_or_else(|| ProjectError::GroupNotFound(group.to_string()))
    }

    /// Strips a leading `<group>/` from the path when the well-known group
    /// carries its own `path`.
    fn correct_for_group_path(&self, file: &mut FileDescriptor, group: &str) {
        let has_path = self
            .document
            .group_by_name(group)
            .is_some_and(|record| record.fields.contains_key("path"));
        if !has_path {
            return;
        }
        let corrected = file
            .path
            .as_deref()
            .and_then(|path| path.strip_prefix(group))
            .and_then(|rest| rest.strip_prefix('/').or_else(|| rest.strip_prefix('\\')))
            .map(str::to_string);
        if corrected.is_some() {
            file.path = corrected;
        }
    }

    /// Id of the well-known group `name`, created under the main group when
    /// missing.
    pub(crate) fn well_known_group(&mut self, name: &str) -> ObjectId {
        if let Some(id) = self.document.group_key_by_name(name) {
            return id;
        }
        let id = self
            .document
            .create_group_record(SectionKind::Group, name, None);
        if let Some(main) = self.document.main_group_id() {
            self.document
                .add_group_child(main.as_str(), ObjectRef::new(id.clone(), name));
        }
        debug!("event=group_add module=service status=ok kind=well_known group={id}");
        id
    }

    fn link_to_well_known_group(&mut self, name: &str, file: &FileDescriptor) {
        if let Some(child) = file.group_child() {
            let group = self.well_known_group(name);
            self.document.add_group_child(group.as_str(), child);
        }
    }

    /// Deletes the file reference matching the descriptor's path, else its
    /// name, and unlinks it from every group. Sets `file.file_ref`.
    fn remove_file_reference(&mut self, file: &mut FileDescriptor) {
        let found = self
            .document
            .file_reference_by_path(file.path_or_basename())
            .or_else(|| self.document.file_reference_by_name(&file.basename))
            .map(|record| record.id.clone());
        if let Some(id) = found {
            self.document.remove_record(SectionKind::FileReference, id.as_str());
            self.document.unlink_from_all_groups(id.as_str());
            file.file_ref = Some(id);
        }
    }

    /// Deletes the build files of `file` and their phase entries. Falls back
    /// to the `"<name> in <group>"` entry of the default `kind` phase when no
    /// build file is found. Sets `file.uuid` to the last one removed.
    fn remove_build_files(&mut self, file: &mut FileDescriptor, kind: SectionKind) {
        let build_files = match &file.file_ref {
            Some(file_ref) => self.document.build_files_referencing(file_ref.as_str()),
            None => self
                .document
                .records(SectionKind::BuildFile)
                .filter(|record| {
                    record
                        .fields
                        .get("fileRef")
                        .and_then(Value::comment)
                        .is_some_and(|comment| comment == file.basename)
                })
                .map(|record| record.id.clone())
                .collect(),
        };

        for id in &build_files {
            self.document.remove_record(SectionKind::BuildFile, id.as_str());
            self.document.remove_build_file_from_phases(id.as_str());
        }

        match build_files.last() {
            Some(last) => file.uuid = Some(last.clone()),
            None => {
                let name = kind.default_phase_name().unwrap_or_else(|| kind.isa());
                let target = file.target.as_ref().map(ObjectId::as_str);
                if let Some(phase) = self.document.build_phase_id(kind, name, target) {
                    self.document
                        .remove_phase_entry_by_comment(phase.as_str(), &file.long_comment());
                }
            }
        }
    }
}

fn srcroot_entry(relative: &str) -> String {
    format!("$(SRCROOT)/{relative}")
}

fn id_label(id: &Option<ObjectId>) -> &str {
    id.as_ref().map(ObjectId::as_str).unwrap_or("none")
}

/// Sorted model file names and the declared current version name.
fn read_data_model(path: &Path) -> ProjectResult<(Vec<String>, Option<String>)> {
    let io_error = |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut current = None;
    if names.iter().any(|name| name == CURRENT_VERSION_FILE) {
        let version_path = path.join(CURRENT_VERSION_FILE);
        let text = std::fs::read_to_string(&version_path).map_err(|source| ProjectError::Io {
            path: version_path.clone(),
            source,
        })?;
        current = CURRENT_VERSION_RE
            .captures(&text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str().trim().to_string());
    }

    let models = names
        .into_iter()
        .filter(|name| extension_of(name) == "xcdatamodel")
        .collect();
    Ok((models, current))
}
