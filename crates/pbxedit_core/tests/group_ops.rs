use pbxedit_core::{
    FileOptions, GroupOptions, LocalizationOptions, ObjectId, ObjectRef, PbxParser, Project,
    ProjectError, SectionKind,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/app.pbxproj");
const MAIN_GROUP: &str = "A00000000000000000000002";
const APP_GROUP: &str = "A00000000000000000000004";
const RESOURCES_GROUP: &str = "A00000000000000000000006";
const SOURCES_PHASE: &str = "E00000000000000000000001";
const RESOURCES_PHASE: &str = "E00000000000000000000003";

fn setup() -> Project {
    Project::parse_text("/work/App/App.xcodeproj/project.pbxproj", FIXTURE, &PbxParser).unwrap()
}

fn setup_in(root: &Path) -> Project {
    Project::parse_text(root.join("App.xcodeproj/project.pbxproj"), FIXTURE, &PbxParser).unwrap()
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Lays out a feature folder with sources, a header, an asset catalog,
/// entitlements, a nested folder and two localizations.
fn feature_tree() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let feature = dir.path().join("Feature");
    write_file(&feature.join("View.m"), "@implementation View @end\n");
    write_file(&feature.join("View.h"), "@interface View @end\n");
    write_file(&feature.join("Feature.entitlements"), "<plist/>\n");
    fs::create_dir_all(feature.join("Media.xcassets")).unwrap();
    write_file(&feature.join("Nested/Helper.swift"), "struct Helper {}\n");
    write_file(&feature.join("en.lproj/Localizable.strings"), "\"hi\" = \"hi\";\n");
    write_file(&feature.join("fr.lproj/Localizable.strings"), "\"hi\" = \"salut\";\n");
    (dir, feature)
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    entries.sort();
    entries
}

fn count(project: &Project, kind: SectionKind) -> usize {
    project.document().section(kind).map_or(0, |section| section.len())
}

#[test]
fn add_pbx_group_builds_nested_tree_from_disk() {
    let (dir, feature) = feature_tree();
    let mut project = setup_in(dir.path());
    let sources_before = project.document().phase_files(SOURCES_PHASE).len();
    let resources_before = project.document().phase_files(RESOURCES_PHASE).len();

    let added = project
        .add_pbx_group(
            &sorted_children(&feature),
            "Feature",
            Some("Feature"),
            None,
            &GroupOptions {
                is_main: true,
                ..GroupOptions::default()
            },
        )
        .unwrap();

    let group = project
        .document()
        .record(SectionKind::Group, added.id.as_str())
        .unwrap();
    assert_eq!(group.get_str("name"), Some("Feature"));
    assert_eq!(group.get_str("path"), Some("Feature"));
    assert!(project
        .document()
        .group_children(MAIN_GROUP)
        .contains(&added.id));

    let child_names: Vec<&str> = group
        .fields
        .get_array("children")
        .unwrap()
        .iter()
        .filter_map(|child| child.comment())
        .collect();
    assert_eq!(
        child_names,
        vec![
            "Feature.entitlements",
            "Media.xcassets",
            "Nested",
            "View.h",
            "View.m",
            "Localizable.strings",
        ]
    );

    // View.m and Nested/Helper.swift compile; the catalog and the strings
    // variant group ship as resources.
    assert_eq!(project.document().phase_files(SOURCES_PHASE).len(), sources_before + 2);
    assert_eq!(project.document().phase_files(RESOURCES_PHASE).len(), resources_before + 2);

    let entitlements = project
        .get_build_property("CODE_SIGN_ENTITLEMENTS", Some("Release"))
        .unwrap();
    assert!(entitlements.is_str("Feature.entitlements"));

    assert!(project.has_known_region("fr"));
    let variant = project
        .document()
        .item_by_comment(SectionKind::VariantGroup, "Localizable.strings")
        .unwrap();
    let regions = project.document().group_children(variant.id.as_str());
    assert_eq!(regions.len(), 2);
    let english = project
        .document()
        .record(SectionKind::FileReference, regions[0].as_str())
        .unwrap();
    assert_eq!(english.get_str("name"), Some("en"));
    assert_eq!(english.get_str("path"), Some("Feature/en.lproj/Localizable.strings"));

    assert!(project.unresolved_references().is_empty());
}

#[test]
fn remove_pbx_group_deletes_subtree_and_build_files() {
    let (dir, feature) = feature_tree();
    let mut project = setup_in(dir.path());
    let ids_before = project.all_uuids();

    project
        .add_pbx_group(
            &sorted_children(&feature),
            "Feature",
            Some("Feature"),
            None,
            &GroupOptions {
                is_main: true,
                ..GroupOptions::default()
            },
        )
        .unwrap();
    assert!(project.remove_pbx_group("Feature"));

    assert_eq!(project.all_uuids(), ids_before);
    assert_eq!(project.document().group_children(MAIN_GROUP).len(), 4);
    assert!(project.unresolved_references().is_empty());
    assert!(!project.remove_pbx_group("Feature"));
}

#[test]
fn existing_references_are_reused_by_path() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("main.m"), "int main() {}\n");
    let mut project = setup_in(dir.path());
    let refs_before = count(&project, SectionKind::FileReference);

    let added = project
        .add_pbx_group(
            &[dir.path().join("main.m")],
            "Shared",
            None,
            None,
            &GroupOptions {
                files_relative_to_project: true,
                ..GroupOptions::default()
            },
        )
        .unwrap();

    assert_eq!(count(&project, SectionKind::FileReference), refs_before);
    assert_eq!(
        project.document().group_children(added.id.as_str()),
        vec![ObjectId::from("C00000000000000000000002")]
    );
    let group = project
        .document()
        .record(SectionKind::Group, added.id.as_str())
        .unwrap();
    assert!(!group.fields.contains_key("path"));
}

#[test]
fn append_to_names_the_parent_group() {
    let mut project = setup();

    let added = project
        .add_pbx_group::<&str>(
            &[],
            "Empty",
            None,
            None,
            &GroupOptions {
                append_to: Some("App".to_string()),
                ..GroupOptions::default()
            },
        )
        .unwrap();

    assert!(project
        .document()
        .group_children(APP_GROUP)
        .contains(&added.id));
}

#[test]
fn groups_nest_and_unlink() {
    let mut project = setup();
    let outer = project.create_group("Outer", Some("Outer"));
    let inner = project.create_group("Inner", None);

    project
        .add_group_to_group(inner.as_str(), outer.as_str())
        .unwrap();
    assert_eq!(project.document().group_children(outer.as_str()), vec![inner.clone()]);

    assert!(project.remove_from_group(&ObjectRef::new(inner.clone(), "Inner"), outer.as_str()));
    assert!(project.document().group_children(outer.as_str()).is_empty());

    let err = project
        .add_to_group(ObjectRef::new(inner.clone(), "Inner"), "FFFFFFFFFFFFFFFFFFFFFFFF")
        .unwrap_err();
    assert!(matches!(err, ProjectError::GroupNotFound(_)));

    let err = project
        .add_group_to_group("FFFFFFFFFFFFFFFFFFFFFFFF", outer.as_str())
        .unwrap_err();
    assert!(matches!(err, ProjectError::GroupNotFound(_)));
}

#[test]
fn localization_variant_group_joins_resources() {
    let mut project = setup();
    let resources_before = project.document().phase_files(RESOURCES_PHASE).len();

    let file = project
        .add_localization_variant_group("Settings.strings", &LocalizationOptions::default())
        .unwrap();

    let key = file.file_ref.clone().unwrap();
    assert!(project
        .document()
        .record(SectionKind::VariantGroup, key.as_str())
        .is_some());
    assert!(project.document().group_children(RESOURCES_GROUP).contains(&key));
    assert_eq!(
        project.document().phase_files(RESOURCES_PHASE).len(),
        resources_before + 1
    );

    let skipped = project
        .add_localization_variant_group(
            "Other.strings",
            &LocalizationOptions {
                skip_add_to_resources_group: true,
                ..LocalizationOptions::default()
            },
        )
        .unwrap();
    assert!(!project
        .document()
        .group_children(RESOURCES_GROUP)
        .contains(skipped.file_ref.as_ref().unwrap()));
}

#[test]
fn known_regions_are_deduplicated() {
    let mut project = setup();

    project.add_known_region("de").unwrap();
    project.add_known_region("de").unwrap();
    let regions = project
        .first_project()
        .and_then(|record| record.fields.get_array("knownRegions"))
        .unwrap();
    assert_eq!(regions.len(), 3);

    assert!(project.remove_known_region("de"));
    assert!(!project.has_known_region("de"));
    assert!(!project.remove_known_region("de"));
    assert!(project.has_known_region("Base"));
}

#[test]
fn data_model_bundle_becomes_version_group() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("Model.xcdatamodeld");
    write_file(&bundle.join("Model.xcdatamodel/contents"), "<model/>\n");
    write_file(&bundle.join("Model 2.xcdatamodel/contents"), "<model/>\n");
    write_file(
        &bundle.join(".xccurrentversion"),
        "<plist><dict><key>_XCCurrentVersionName</key>\n\t<string>Model.xcdatamodel</string></dict></plist>\n",
    );
    let mut project = setup_in(dir.path());
    let sources_before = project.document().phase_files(SOURCES_PHASE).len();
    let bundle_path = bundle.to_string_lossy().into_owned();

    let added = project
        .add_data_model_document(&bundle_path, None, &FileOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(added.models.len(), 2);
    assert_eq!(added.models[0].basename, "Model 2.xcdatamodel");
    assert_eq!(added.current_model, added.models[1].file_ref);

    let key = added.file.file_ref.clone().unwrap();
    let version_group = project
        .document()
        .record(SectionKind::VersionGroup, key.as_str())
        .unwrap();
    assert_eq!(version_group.get_str("versionGroupType"), Some("wrapper.xcdatamodel"));
    assert_eq!(
        version_group.get_str("currentVersion"),
        added.current_model.as_ref().map(|id| id.as_str())
    );
    assert!(project.document().group_children(RESOURCES_GROUP).contains(&key));
    assert_eq!(
        project.document().phase_files(SOURCES_PHASE).len(),
        sources_before + 1
    );
    assert!(project.unresolved_references().is_empty());

    assert!(project
        .add_data_model_document(&bundle_path, None, &FileOptions::default())
        .unwrap()
        .is_none());
}

#[test]
fn data_model_without_versions_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("Empty.xcdatamodeld");
    fs::create_dir_all(&bundle).unwrap();
    let mut project = setup_in(dir.path());
    let before = project.clone();

    let err = project
        .add_data_model_document(&bundle.to_string_lossy(), None, &FileOptions::default())
        .unwrap_err();

    assert!(matches!(err, ProjectError::InvalidDataModel(_)));
    assert_eq!(project, before);
}

#[test]
fn data_model_in_unknown_group_fails() {
    let mut project = setup();

    let err = project
        .add_data_model_document("/nowhere/Model.xcdatamodeld", Some("Missing"), &FileOptions::default())
        .unwrap_err();

    assert!(matches!(err, ProjectError::GroupNotFound(_)));
}
