//! Target, build-phase, configuration-list and dependency operations.
//!
//! # Responsibility
//! - Create native targets with their product, configurations and embedding.
//! - Create and remove build phases, dependencies and target attributes.
//! - Remove a target together with every record only it referenced.
//!
//! # Invariants
//! - A new target is appended to the project's `targets` list only after its
//!   configuration list, product and build file exist.
//! - `remove_target` leaves no reference to the removed target behind.

use crate::model::document::{Record, SectionKind};
use crate::model::file::{FileDescriptor, FileOptions};
use crate::model::target::{ConfigurationSpec, PhaseSpec, TargetType};
use crate::model::value::{Dict, ObjectId, ObjectRef, Value};
use crate::service::{Project, ProjectError, ProjectResult};
use log::{debug, info};
use std::collections::HashSet;

const BUILD_ACTION_MASK: &str = "2147483647";
const DEFAULT_CONFIGURATION: &str = "Release";
const WATCH_CONTENT_PATH: &str = "$(CONTENTS_FOLDER_PATH)/Watch";
const RUNPATH_SEARCH_PATHS: &str =
    "$(inherited) @executable_path/Frameworks @executable_path/../../Frameworks";

/// Result of [`Project::add_target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedTarget {
    pub id: ObjectId,
    /// Product reference, with its build file id in `uuid`.
    pub product: FileDescriptor,
    pub configuration_list: ObjectId,
}

impl Project {
    /// Creates a native target named `name`.
    ///
    /// # Contract
    /// - Creates `Debug` and `Release` configurations reading
    ///   `{subfolder}/Info.plist` (`{name}/Info.plist` without a subfolder).
    /// - Extension and watch targets are embedded into `parent`, or the
    ///   first existing target, through a new copy-files phase, and that
    ///   target gains a dependency on the new one.
    ///
    /// # Errors
    /// - [`ProjectError::EmptyTargetName`] for a blank name.
    /// - [`ProjectError::InvalidTargetType`] for an unknown type.
    /// - [`ProjectError::ProjectNotFound`] without a project record.
    /// - [`ProjectError::TargetNotFound`] for an unknown `parent`.
    pub fn add_target(
        &mut self,
        name: &str,
        target_type: &str,
        subfolder: Option<&str>,
        parent: Option<&str>,
    ) -> ProjectResult<AddedTarget> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::EmptyTargetName);
        }
        let target_type: TargetType = target_type
            .trim()
            .parse()
            .map_err(ProjectError::InvalidTargetType)?;
        let project_id = self.require_project_id()?;
        let owner = match parent {
            Some(parent) => Some(self.require_target(parent)?),
            None => self.document.first_target_id(),
        };

        let subfolder = subfolder.unwrap_or(name);
        let release_settings = Dict::new()
            .with("INFOPLIST_FILE", format!("{subfolder}/Info.plist"))
            .with("LD_RUNPATH_SEARCH_PATHS", RUNPATH_SEARCH_PATHS)
            .with("PRODUCT_NAME", name)
            .with("SKIP_INSTALL", "YES");
        let mut debug_settings = Dict::new().with(
            "GCC_PREPROCESSOR_DEFINITIONS",
            vec![Value::from("DEBUG=1"), Value::from("$(inherited)")],
        );
        for (key, value) in release_settings.iter() {
            debug_settings.insert(key, value.clone());
        }

        let configuration_list = self.add_configuration_list(
            &[
                ConfigurationSpec::new("Debug", debug_settings),
                ConfigurationSpec::new("Release", release_settings),
            ],
            DEFAULT_CONFIGURATION,
            &format!("Build configuration list for PBXNativeTarget \"{name}\""),
        );

        let id = self.document.allocate_id();
        let product = self.add_product_file(
            name,
            &FileOptions {
                group: Some("Copy Files".to_string()),
                target: Some(id.clone()),
                explicit_file_type: Some(target_type.product_file_type().to_string()),
                ..FileOptions::default()
            },
        );
        self.insert_build_file(&product);

        let mut fields = Dict::new()
            .with("isa", SectionKind::NativeTarget.isa())
            .with(
                "buildConfigurationList",
                ObjectRef::new(
                    configuration_list.clone(),
                    format!("Build configuration list for PBXNativeTarget \"{name}\""),
                ),
            )
            .with("buildPhases", Vec::<Value>::new())
            .with("buildRules", Vec::<Value>::new())
            .with("dependencies", Vec::<Value>::new())
            .with("name", name)
            .with("productName", name);
        if let Some(reference) = product.group_child() {
            fields.insert("productReference", reference);
        }
        fields.insert("productType", target_type.product_type());
        self.document
            .insert_record(SectionKind::NativeTarget, Record::new(id.clone(), name, fields));

        if let (true, Some(owner)) = (target_type.embeds_in_parent(), &owner) {
            let watch_app = target_type == TargetType::WatchApp;
            let spec = PhaseSpec::CopyFiles {
                destination: target_type.copy_destination(),
                dst_path: if watch_app {
                    WATCH_CONTENT_PATH.to_string()
                } else {
                    String::new()
                },
            };
            let comment = if watch_app { "Embed Watch Content" } else { "Copy Files" };
            let phase = self.add_build_phase(&[], &spec, comment, Some(owner.as_str()))?;
            self.push_phase_entry(&phase, &product);
        }

        if let Some(project) = self.document.record_mut(SectionKind::Project, project_id.as_str()) {
            project
                .fields
                .entry_array("targets")
                .push(Value::Ref(ObjectRef::new(id.clone(), name)));
        }
        if let Some(owner) = &owner {
            self.add_target_dependency(owner.as_str(), &[id.as_str()])?;
        }

        info!(
            "event=target_add module=service status=ok target={} type={} embedded={}",
            id,
            target_type,
            target_type.embeds_in_parent() && owner.is_some()
        );
        Ok(AddedTarget {
            id,
            product,
            configuration_list,
        })
    }

    /// Makes `target` depend on each of `dependencies` through a container
    /// item proxy and a target dependency record.
    ///
    /// # Errors
    /// - [`ProjectError::ProjectNotFound`] without a project record.
    /// - [`ProjectError::TargetNotFound`] when any key is no native target;
    ///   nothing is written in that case.
    pub fn add_target_dependency(&mut self, target: &str, dependencies: &[&str]) -> ProjectResult<()> {
        let project_id = self.require_project_id()?;
        self.require_target(target)?;
        let mut named = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let record = self
                .document
                .native_target(dependency)
                .ok_or_else(|| ProjectError::TargetNotFound(dependency.to_string()))?;
            let name = record
                .get_str("name")
                .or_else(|| record.comment())
                .unwrap_or_default()
                .to_string();
            named.push((ObjectId::from(*dependency), name));
        }

        let mut entries = Vec::with_capacity(named.len());
        for (dependency, name) in named {
            let proxy = self.document.allocate_id();
            let proxy_fields = Dict::new()
                .with("isa", SectionKind::ContainerItemProxy.isa())
                .with("containerPortal", ObjectRef::new(project_id.clone(), "Project object"))
                .with("proxyType", 1u32)
                .with("remoteGlobalIDString", dependency.as_str())
                .with("remoteInfo", name.as_str());
            self.document.insert_record(
                SectionKind::ContainerItemProxy,
                Record::new(proxy.clone(), SectionKind::ContainerItemProxy.isa(), proxy_fields),
            );

            let record_id = self.document.allocate_id();
            let dependency_fields = Dict::new()
                .with("isa", SectionKind::TargetDependency.isa())
                .with("target", ObjectRef::new(dependency.clone(), name.as_str()))
                .with(
                    "targetProxy",
                    ObjectRef::new(proxy, SectionKind::ContainerItemProxy.isa()),
                );
            self.document.insert_record(
                SectionKind::TargetDependency,
                Record::new(record_id.clone(), SectionKind::TargetDependency.isa(), dependency_fields),
            );
            entries.push(Value::Ref(ObjectRef::new(
                record_id,
                SectionKind::TargetDependency.isa(),
            )));
        }

        if let Some(record) = self.document.record_mut(SectionKind::NativeTarget, target) {
            record.fields.entry_array("dependencies").extend(entries);
        }
        debug!(
            "event=target_dependency_add module=service status=ok target={target} count={}",
            dependencies.len()
        );
        Ok(())
    }

    /// Creates a build phase of `spec`'s kind named `comment` on `target`,
    /// or the first target, listing `paths`.
    ///
    /// A path already behind a build file reuses it; other paths get a new
    /// file reference and build file.
    ///
    /// # Errors
    /// - [`ProjectError::TargetNotFound`] for an unknown `target`.
    /// - [`ProjectError::NoTargets`] when `target` is `None` and the project
    ///   lists no targets.
    pub fn add_build_phase(
        &mut self,
        paths: &[&str],
        spec: &PhaseSpec,
        comment: &str,
        target: Option<&str>,
    ) -> ProjectResult<ObjectId> {
        let owner = self.target_or_first(target)?;
        let kind = spec.section_kind();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let mut file = FileDescriptor::classify(path, &FileOptions::default());
            let existing = self
                .document
                .file_reference_by_path(path)
                .map(|record| (record.id.clone(), record.comment().map(str::to_string)));
            if let Some((file_ref, ref_comment)) = existing {
                if let Some(build_file) = self.document.build_files_referencing(file_ref.as_str()).into_iter().next() {
                    if let Some(ref_comment) = ref_comment {
                        file.basename = ref_comment;
                    }
                    files.push(Value::Ref(ObjectRef::new(build_file, file.long_comment())));
                    continue;
                }
            }
            file.file_ref = Some(self.document.allocate_id());
            file.uuid = Some(self.document.allocate_id());
            self.insert_file_reference(&file);
            self.insert_build_file(&file);
            if let Some(entry) = file.phase_entry() {
                files.push(Value::Ref(entry));
            }
        }

        let mut fields = Dict::new()
            .with("isa", kind.isa())
            .with("buildActionMask", BUILD_ACTION_MASK);
        if let PhaseSpec::CopyFiles { destination, dst_path } = spec {
            fields.insert("dstPath", dst_path.as_str());
            fields.insert("dstSubfolderSpec", destination.subfolder_spec());
        }
        fields.insert("files", files);
        match spec {
            PhaseSpec::ShellScript(script) => {
                let inputs: Vec<Value> = script.input_paths.iter().map(|p| Value::from(p.as_str())).collect();
                let outputs: Vec<Value> = script.output_paths.iter().map(|p| Value::from(p.as_str())).collect();
                fields.insert("inputPaths", inputs);
                fields.insert("name", comment);
                fields.insert("outputPaths", outputs);
            }
            PhaseSpec::CopyFiles { .. } => {
                fields.insert("name", comment);
            }
            _ => {}
        }
        fields.insert("runOnlyForDeploymentPostprocessing", 0u32);
        if let PhaseSpec::ShellScript(script) = spec {
            fields.insert("shellPath", script.shell_path.as_str());
            fields.insert("shellScript", script.shell_script.as_str());
        }

        let id = self.document.allocate_id();
        self.document
            .insert_record(kind, Record::new(id.clone(), comment, fields));
        if let Some(record) = self.document.record_mut(SectionKind::NativeTarget, owner.as_str()) {
            record
                .fields
                .entry_array("buildPhases")
                .push(Value::Ref(ObjectRef::new(id.clone(), comment)));
        }
        debug!(
            "event=build_phase_add module=service status=ok phase={id} kind={} target={owner} files={}",
            kind.isa(),
            paths.len()
        );
        Ok(id)
    }

    /// Removes every phase named `comment` from `target` (or the first
    /// target) and deletes the phase records. Returns whether any matched.
    pub fn remove_build_phase(&mut self, comment: &str, target: Option<&str>) -> ProjectResult<bool> {
        let owner = self.target_or_first(target)?;
        let Some(phases) = self
            .document
            .record_mut(SectionKind::NativeTarget, owner.as_str())
            .and_then(|record| record.fields.get_array_mut("buildPhases"))
        else {
            return Ok(false);
        };

        let mut removed = Vec::new();
        phases.retain(|phase| {
            if phase.comment() == Some(comment) {
                if let Some(id) = phase.as_str() {
                    removed.push(ObjectId::from(id));
                }
                false
            } else {
                true
            }
        });
        for id in &removed {
            if let Some(kind) = self.document.phase_kind_of(id.as_str()) {
                self.document.remove_record(kind, id.as_str());
            }
        }
        debug!(
            "event=build_phase_remove module=service status=ok target={owner} count={}",
            removed.len()
        );
        Ok(!removed.is_empty())
    }

    /// Creates one configuration per spec and a list holding them.
    pub fn add_configuration_list(
        &mut self,
        configurations: &[ConfigurationSpec],
        default_name: &str,
        comment: &str,
    ) -> ObjectId {
        let mut entries = Vec::with_capacity(configurations.len());
        for configuration in configurations {
            let id = self.document.allocate_id();
            let fields = Dict::new()
                .with("isa", SectionKind::BuildConfiguration.isa())
                .with("buildSettings", configuration.build_settings.clone())
                .with("name", configuration.name.as_str());
            self.document.insert_record(
                SectionKind::BuildConfiguration,
                Record::new(id.clone(), configuration.name.as_str(), fields),
            );
            entries.push(Value::Ref(ObjectRef::new(id, configuration.name.as_str())));
        }

        let id = self.document.allocate_id();
        let fields = Dict::new()
            .with("isa", SectionKind::ConfigurationList.isa())
            .with("buildConfigurations", entries)
            .with("defaultConfigurationIsVisible", 0u32)
            .with("defaultConfigurationName", default_name);
        self.document
            .insert_record(SectionKind::ConfigurationList, Record::new(id.clone(), comment, fields));
        id
    }

    /// Sets `TargetAttributes.<target>.<key>` on the project.
    ///
    /// # Errors
    /// - [`ProjectError::NoTargets`] / [`ProjectError::TargetNotFound`] when
    ///   the target cannot be resolved.
    /// - [`ProjectError::ProjectNotFound`] without a project record.
    pub fn add_target_attribute(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        target: Option<&str>,
    ) -> ProjectResult<()> {
        let target = self.target_or_first(target)?;
        let project = self
            .document
            .first_project_mut()
            .ok_or(ProjectError::ProjectNotFound)?;
        project
            .fields
            .entry_dict("attributes")
            .entry_dict("TargetAttributes")
            .entry_dict(target.as_str())
            .insert(key, value);
        Ok(())
    }

    /// Deletes `TargetAttributes.<target>.<key>`. Returns whether it existed.
    pub fn remove_target_attribute(&mut self, key: &str, target: Option<&str>) -> ProjectResult<bool> {
        let target = self.target_or_first(target)?;
        let removed = self
            .document
            .first_project_mut()
            .and_then(|project| project.fields.get_dict_mut("attributes"))
            .and_then(|attributes| attributes.get_dict_mut("TargetAttributes"))
            .and_then(|targets| targets.get_dict_mut(target.as_str()))
            .and_then(|attributes| attributes.remove(key))
            .is_some();
        Ok(removed)
    }

    /// Removes the target `key` and every record only it referenced.
    ///
    /// # Contract
    /// - Deletes its phases and their build files. File references linked
    ///   by its Frameworks phase go too once no other build file points at
    ///   them.
    /// - Deletes its configurations, product, product build files and any
    ///   copy phase left empty by that, plus every dependency and proxy
    ///   naming it, its target attributes and a group with its name.
    ///
    /// # Errors
    /// - [`ProjectError::TargetNotFound`] when `key` is no native target.
    pub fn remove_target(&mut self, key: &str) -> ProjectResult<()> {
        let target = self
            .document
            .native_target(key)
            .cloned()
            .ok_or_else(|| ProjectError::TargetNotFound(key.to_string()))?;
        let name = target
            .get_str("name")
            .or_else(|| target.comment())
            .unwrap_or_default()
            .to_string();

        // phases and the build files they list
        let phase_ids = id_list(&target.fields, "buildPhases");
        let mut doomed_build_files = Vec::new();
        let mut linked_build_files: HashSet<ObjectId> = HashSet::new();
        for phase in &phase_ids {
            let files = self.document.phase_files(phase.as_str());
            let kind = self.document.phase_kind_of(phase.as_str());
            if kind == Some(SectionKind::FrameworksBuildPhase) {
                linked_build_files.extend(files.iter().cloned());
            }
            doomed_build_files.extend(files);
            if let Some(kind) = kind {
                self.document.remove_record(kind, phase.as_str());
            }
        }
        // every linked file reference is a candidate, libraries included
        let mut orphan_candidates = Vec::new();
        for build_file in &doomed_build_files {
            if let Some(record) = self.document.remove_record(SectionKind::BuildFile, build_file.as_str()) {
                if let Some(file_ref) = record.get_str("fileRef") {
                    if linked_build_files.contains(build_file) {
                        orphan_candidates.push(ObjectId::from(file_ref));
                    }
                }
            }
            self.document.remove_build_file_from_phases(build_file.as_str());
        }
        for file_ref in &orphan_candidates {
            if self.document.build_files_referencing(file_ref.as_str()).is_empty() {
                self.document.remove_record(SectionKind::FileReference, file_ref.as_str());
                self.document.unlink_from_all_groups(file_ref.as_str());
            }
        }

        if let Some(project) = self.document.first_project_mut() {
            if let Some(targets) = project.fields.get_array_mut("targets") {
                targets.retain(|entry| entry.as_str() != Some(key));
            }
        }

        // configurations
        for configuration in self.document.configuration_ids_for_target(key) {
            self.document
                .remove_record(SectionKind::BuildConfiguration, configuration.as_str());
        }
        if let Some(list) = target.get_str("buildConfigurationList") {
            self.document.remove_record(SectionKind::ConfigurationList, list);
        }

        // product and the copy phases embedding it
        if let Some(product) = target.get_str("productReference") {
            for build_file in self.document.build_files_referencing(product) {
                self.remove_embedding_entry(build_file.as_str());
                self.document.remove_record(SectionKind::BuildFile, build_file.as_str());
            }
            self.document.unlink_from_all_groups(product);
            self.document.remove_record(SectionKind::FileReference, product);
        }

        // dependencies in both directions
        let mut doomed_dependencies: HashSet<ObjectId> = id_list(&target.fields, "dependencies").into_iter().collect();
        doomed_dependencies.extend(
            self.document
                .records(SectionKind::TargetDependency)
                .filter(|record| record.get_str("target") == Some(key))
                .map(|record| record.id.clone()),
        );
        for dependency in &doomed_dependencies {
            if let Some(record) = self.document.remove_record(SectionKind::TargetDependency, dependency.as_str()) {
                if let Some(proxy) = record.get_str("targetProxy") {
                    self.document.remove_record(SectionKind::ContainerItemProxy, proxy);
                }
            }
        }
        if let Some(section) = self.document.section_mut(SectionKind::NativeTarget) {
            for record in section.records_mut() {
                if let Some(dependencies) = record.fields.get_array_mut("dependencies") {
                    dependencies.retain(|entry| {
                        entry
                            .as_str()
                            .map_or(true, |id| !doomed_dependencies.contains(id))
                    });
                }
            }
        }
        let orphan_proxies: Vec<ObjectId> = self
            .document
            .records(SectionKind::ContainerItemProxy)
            .filter(|record| record.get_str("remoteGlobalIDString") == Some(key))
            .map(|record| record.id.clone())
            .collect();
        for proxy in &orphan_proxies {
            self.document.remove_record(SectionKind::ContainerItemProxy, proxy.as_str());
        }

        if let Some(targets) = self
            .document
            .first_project_mut()
            .and_then(|project| project.fields.get_dict_mut("attributes"))
            .and_then(|attributes| attributes.get_dict_mut("TargetAttributes"))
        {
            targets.remove(key);
        }
        self.document.remove_record(SectionKind::NativeTarget, key);
        self.remove_pbx_group(&name);

        info!(
            "event=target_remove module=service status=ok target={key} phases={} build_files={}",
            phase_ids.len(),
            doomed_build_files.len()
        );
        Ok(())
    }

    /// Removes every target whose `productType` is `product_type`. Returns
    /// how many were removed.
    pub fn remove_targets_by_product_type(&mut self, product_type: &str) -> ProjectResult<usize> {
        let doomed: Vec<ObjectId> = self
            .document
            .records(SectionKind::NativeTarget)
            .filter(|record| {
                record
                    .fields
                    .get("productType")
                    .is_some_and(|value| value.is_str(product_type))
            })
            .map(|record| record.id.clone())
            .collect();
        for key in &doomed {
            self.remove_target(key.as_str())?;
        }
        Ok(doomed.len())
    }

    /// Strips `build_file` from copy phases; a copy phase holding nothing
    /// else is deleted and dropped from every target.
    fn remove_embedding_entry(&mut self, build_file: &str) {
        let phases: Vec<ObjectId> = self
            .document
            .records(SectionKind::CopyFilesBuildPhase)
            .filter(|record| {
                record
                    .fields
                    .get_array("files")
                    .is_some_and(|files| files.iter().any(|entry| entry.as_str() == Some(build_file)))
            })
            .map(|record| record.id.clone())
            .collect();

        for phase in phases {
            let sole_entry = self.document.phase_files(phase.as_str()).len() == 1;
            if !sole_entry {
                if let Some(files) = self
                    .document
                    .record_mut(SectionKind::CopyFilesBuildPhase, phase.as_str())
                    .and_then(|record| record.fields.get_array_mut("files"))
                {
                    files.retain(|entry| entry.as_str() != Some(build_file));
                }
                continue;
            }
            self.document
                .remove_record(SectionKind::CopyFilesBuildPhase, phase.as_str());
            if let Some(section) = self.document.section_mut(SectionKind::NativeTarget) {
                for record in section.records_mut() {
                    if let Some(build_phases) = record.fields.get_array_mut("buildPhases") {
                        build_phases.retain(|entry| entry.as_str() != Some(phase.as_str()));
                    }
                }
            }
        }
    }
}

fn id_list(fields: &Dict, key: &str) -> Vec<ObjectId> {
    fields
        .get_array(key)
        .map(|items| items.iter().filter_map(Value::as_str).map(ObjectId::from).collect())
        .unwrap_or_default()
}
