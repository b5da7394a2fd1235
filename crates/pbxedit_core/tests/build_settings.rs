use pbxedit_core::{
    FileDescriptor, FileOptions, PbxParser, Project, ProjectError, SearchPathSource, Value,
};

const FIXTURE: &str = include_str!("fixtures/app.pbxproj");
const APP_TARGET: &str = "B00000000000000000000001";
const PROJECT_DEBUG: &str = "F20000000000000000000001";
const TARGET_DEBUG: &str = "F20000000000000000000003";
const TARGET_RELEASE: &str = "F20000000000000000000004";

fn setup() -> Project {
    Project::parse_text("/work/App/App.xcodeproj/project.pbxproj", FIXTURE, &PbxParser).unwrap()
}

fn setting<'a>(project: &'a Project, configuration: &str, key: &str) -> Option<&'a Value> {
    project
        .document()
        .record(pbxedit_core::SectionKind::BuildConfiguration, configuration)
        .and_then(|record| record.fields.get_dict("buildSettings"))
        .and_then(|settings| settings.get(key))
}

fn list(project: &Project, configuration: &str, key: &str) -> Vec<String> {
    setting(project, configuration, key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn build_property_targets_named_configurations() {
    let mut project = setup();

    project.add_build_property("SWIFT_VERSION", "5.0", Some("Debug"), None);

    assert_eq!(project.get_build_config_by_name("Debug").len(), 2);
    assert!(setting(&project, PROJECT_DEBUG, "SWIFT_VERSION").is_some());
    assert!(setting(&project, TARGET_DEBUG, "SWIFT_VERSION").is_some());
    assert!(project.get_build_property("SWIFT_VERSION", Some("Release")).is_none());
    assert!(project
        .get_build_property("SWIFT_VERSION", None)
        .is_some_and(|value| value.is_str("5.0")));
}

#[test]
fn build_property_can_filter_by_product_name() {
    let mut project = setup();

    project.add_build_property("ENABLE_BITCODE", "NO", None, Some("\"$(TARGET_NAME)\""));

    assert!(setting(&project, PROJECT_DEBUG, "ENABLE_BITCODE").is_none());
    assert!(setting(&project, TARGET_DEBUG, "ENABLE_BITCODE").is_some());
    assert!(setting(&project, TARGET_RELEASE, "ENABLE_BITCODE").is_some());
}

#[test]
fn remove_and_update_build_property() {
    let mut project = setup();

    project.remove_build_property("OTHER_LDFLAGS", None);
    assert!(project.get_build_property("OTHER_LDFLAGS", None).is_none());

    project.update_build_property("SDKROOT", "macosx", Some("Release"));
    assert!(project
        .get_build_property("SDKROOT", Some("Release"))
        .is_some_and(|value| value.is_str("macosx")));
    assert!(project
        .get_build_property("SDKROOT", Some("Debug"))
        .is_some_and(|value| value.is_str("iphoneos")));

    project.remove_build_property("SDKROOT", Some("Debug"));
    assert!(project.get_build_property("SDKROOT", Some("Debug")).is_none());
}

#[test]
fn update_product_name_rewrites_every_configuration() {
    let mut project = setup();

    project.update_product_name("Renamed");

    assert_eq!(project.product_name().as_deref(), Some("Renamed"));
    for configuration in project.get_build_config_by_name("Release") {
        let name = configuration
            .fields
            .get_dict("buildSettings")
            .and_then(|settings| settings.get("PRODUCT_NAME"))
            .unwrap();
        assert!(name.is_str("Renamed"));
    }
}

#[test]
fn build_settings_scope_to_a_target() {
    let mut project = setup();

    project
        .add_to_build_settings("CODE_SIGN_STYLE", "Automatic", Some(APP_TARGET))
        .unwrap();

    assert!(setting(&project, PROJECT_DEBUG, "CODE_SIGN_STYLE").is_none());
    assert!(setting(&project, TARGET_DEBUG, "CODE_SIGN_STYLE").is_some());
    assert!(setting(&project, TARGET_RELEASE, "CODE_SIGN_STYLE").is_some());

    let err = project
        .add_to_build_settings("CODE_SIGN_STYLE", "Manual", Some("FFFFFFFFFFFFFFFFFFFFFFFF"))
        .unwrap_err();
    assert!(matches!(err, ProjectError::TargetNotFound(_)));

    project.remove_from_build_settings("CODE_SIGN_STYLE");
    assert!(project.get_build_property("CODE_SIGN_STYLE", None).is_none());
}

#[test]
fn linker_flags_are_appended_once() {
    let mut project = setup();

    project.add_to_other_linker_flags("-lz");
    project.add_to_other_linker_flags("-lz");

    assert_eq!(list(&project, TARGET_DEBUG, "OTHER_LDFLAGS"), vec!["$(inherited)", "-ObjC", "-lz"]);
    assert_eq!(list(&project, TARGET_RELEASE, "OTHER_LDFLAGS"), vec!["$(inherited)", "-lz"]);
    assert!(setting(&project, PROJECT_DEBUG, "OTHER_LDFLAGS").is_none());

    project.remove_from_other_linker_flags("-lz");
    assert_eq!(list(&project, TARGET_DEBUG, "OTHER_LDFLAGS"), vec!["$(inherited)", "-ObjC"]);
    assert_eq!(list(&project, TARGET_RELEASE, "OTHER_LDFLAGS"), vec!["$(inherited)"]);
}

#[test]
fn header_search_path_is_made_relative_to_source_root() {
    let mut project = setup();

    project.add_to_header_search_paths(SearchPathSource::Path("/work/App/Vendor/include"), None);
    project.add_to_header_search_paths(SearchPathSource::Path("Vendor/include"), None);

    assert_eq!(
        list(&project, TARGET_DEBUG, "HEADER_SEARCH_PATHS"),
        vec!["$(inherited)", "$(SRCROOT)/Vendor/include"]
    );

    project.add_to_header_search_paths(SearchPathSource::Path("Other"), Some("NotAProduct"));
    assert!(!list(&project, TARGET_DEBUG, "HEADER_SEARCH_PATHS")
        .iter()
        .any(|entry| entry.contains("Other")));

    project.remove_from_header_search_paths(SearchPathSource::Path("Vendor/include"));
    assert_eq!(list(&project, TARGET_DEBUG, "HEADER_SEARCH_PATHS"), vec!["$(inherited)"]);
}

#[test]
fn library_search_path_follows_file_directory() {
    let mut project = setup();
    let file = FileDescriptor::classify("libs/libfoo.a", &FileOptions::default());

    project.add_to_library_search_paths(SearchPathSource::File(&file));

    assert_eq!(
        list(&project, TARGET_RELEASE, "LIBRARY_SEARCH_PATHS"),
        vec!["$(inherited)", "$(SRCROOT)/$(TARGET_NAME)/libs"]
    );

    project.remove_from_library_search_paths(SearchPathSource::File(&file));
    assert_eq!(list(&project, TARGET_RELEASE, "LIBRARY_SEARCH_PATHS"), vec!["$(inherited)"]);
}

#[test]
fn search_paths_need_a_product_name() {
    let mut project = setup();
    project.remove_build_property("PRODUCT_NAME", None);
    let file = FileDescriptor::classify("libs/libfoo.a", &FileOptions::default());

    project.add_to_library_search_paths(SearchPathSource::File(&file));

    assert!(project.get_build_property("LIBRARY_SEARCH_PATHS", None).is_none());
}

#[test]
fn custom_framework_embeds_and_signs() {
    let mut project = setup();
    let options = FileOptions {
        custom_framework: true,
        embed: true,
        sign: true,
        ..FileOptions::default()
    };

    let embedded = project.add_framework("Vendor/Acme.framework", &options).unwrap();

    assert_eq!(embedded.long_comment(), "Acme.framework in Embed Frameworks");
    let phase = project
        .build_phase(
            pbxedit_core::SectionKind::CopyFilesBuildPhase,
            "Embed Frameworks",
            Some(APP_TARGET),
        )
        .unwrap()
        .unwrap();
    assert_eq!(
        project.document().phase_files(phase.as_str()),
        vec![embedded.uuid.clone().unwrap()]
    );
    let build_file = project
        .document()
        .record(pbxedit_core::SectionKind::BuildFile, embedded.uuid.as_ref().unwrap().as_str())
        .unwrap();
    let attributes = build_file
        .fields
        .get_dict("settings")
        .and_then(|settings| settings.get_array("ATTRIBUTES"))
        .unwrap();
    assert!(attributes.iter().any(|attribute| attribute.is_str("CodeSignOnCopy")));
    assert_eq!(
        list(&project, TARGET_DEBUG, "FRAMEWORK_SEARCH_PATHS"),
        vec!["$(inherited)", "Vendor"]
    );
    assert_eq!(
        project
            .document()
            .build_files_referencing(embedded.file_ref.as_ref().unwrap().as_str())
            .len(),
        2
    );

    let removed = project.remove_framework("Vendor/Acme.framework", &options);
    assert_eq!(removed.file_ref, embedded.file_ref);
    assert!(project.document().phase_files(phase.as_str()).is_empty());
    assert_eq!(list(&project, TARGET_DEBUG, "FRAMEWORK_SEARCH_PATHS"), vec!["$(inherited)"]);
    assert!(project.unresolved_references().is_empty());
}

#[test]
fn system_framework_reuses_existing_reference() {
    let mut project = setup();

    let file = project
        .add_framework("Foundation.framework", &FileOptions::default())
        .unwrap();

    assert_eq!(file.file_ref.as_ref().map(|id| id.as_str()), Some("C00000000000000000000006"));
    assert_eq!(file.uuid.as_ref().map(|id| id.as_str()), Some("D00000000000000000000003"));

    let weak = project
        .add_framework(
            "CoreData.framework",
            &FileOptions {
                weak: true,
                ..FileOptions::default()
            },
        )
        .unwrap();
    let reference = project
        .document()
        .record(pbxedit_core::SectionKind::FileReference, weak.file_ref.as_ref().unwrap().as_str())
        .unwrap();
    assert_eq!(reference.get_str("path"), Some("System/Library/Frameworks/CoreData.framework"));
    assert_eq!(reference.get_str("sourceTree"), Some("SDKROOT"));
    assert!(project
        .group_by_name("Frameworks")
        .and_then(|group| group.fields.get_array("children"))
        .is_some_and(|children| children.len() == 2));
}
