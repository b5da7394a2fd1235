//! File descriptor classifier.
//!
//! # Responsibility
//! - Turn a path plus caller options into a [`FileDescriptor`] carrying the
//!   kind, owning phase group, on-disk path, encoding and source tree.
//! - Render the file-reference and build-file records for a descriptor.
//!
//! # Invariants
//! - Classification is pure and never fails; unknown input falls back to
//!   default kind, group and source tree.
//! - A descriptor with an explicit (product) type has no path, group, kind
//!   or encoding of its own.

use crate::model::file_type::{
    encoding_for_file_type, extension_for_file_type, file_type_for_extension,
    group_for_file_type, path_prefix_for_file_type, source_tree_for_file_type,
    DEFAULT_FILE_TYPE, DEFAULT_GROUP, DEFAULT_SOURCE_TREE, PRODUCT_SOURCE_TREE,
};
use crate::model::value::{Dict, ObjectId, ObjectRef, Value};
use serde::{Deserialize, Serialize};

/// Per-call options accepted by every file operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Display name override; defaults to the path's last component.
    pub basename: Option<String>,
    /// Kind override; skips extension detection.
    pub last_known_file_type: Option<String>,
    /// Marks a build-product reference of the given kind.
    pub explicit_file_type: Option<String>,
    pub default_encoding: Option<u32>,
    pub source_tree: Option<String>,
    /// Owning phase group override.
    pub group: Option<String>,
    /// Target whose build phases receive the file; the first target otherwise.
    pub target: Option<ObjectId>,
    pub custom_framework: bool,
    /// Framework linking; `None` links.
    pub link: Option<bool>,
    pub embed: bool,
    pub sign: bool,
    pub weak: bool,
    pub compiler_flags: Option<String>,
    /// Routes the file through the `Plugins` group.
    pub plugin: bool,
    /// Resource belongs to a variant group; no build file of its own.
    pub variant_group: bool,
}

/// Per-build-file `settings` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFileSettings {
    pub attributes: Vec<String>,
    pub compiler_flags: Option<String>,
}

impl BuildFileSettings {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.compiler_flags.is_none()
    }

    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        if !self.attributes.is_empty() {
            let attributes: Vec<Value> = self
                .attributes
                .iter()
                .map(|attribute| Value::from(attribute.as_str()))
                .collect();
            dict.insert("ATTRIBUTES", attributes);
        }
        if let Some(flags) = &self.compiler_flags {
            dict.insert("COMPILER_FLAGS", flags.as_str());
        }
        dict
    }
}

/// A classified file plus the ids assigned to it by an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub basename: String,
    pub path: Option<String>,
    pub last_known_file_type: Option<String>,
    pub explicit_file_type: Option<String>,
    pub group: Option<String>,
    pub source_tree: String,
    pub file_encoding: Option<u32>,
    pub custom_framework: bool,
    /// Directory of a custom framework, used as its search path.
    pub dirname: Option<String>,
    pub plugin: bool,
    pub settings: BuildFileSettings,
    pub target: Option<ObjectId>,
    /// Id of the `PBXFileReference` (or group) this file resolves to.
    pub file_ref: Option<ObjectId>,
    /// Id of the `PBXBuildFile` created for this file, when any.
    pub uuid: Option<ObjectId>,
}

impl FileDescriptor {
    pub fn classify(path: &str, options: &FileOptions) -> Self {
        let normalized = path.replace('\\', "/");
        let mut basename = options
            .basename
            .clone()
            .unwrap_or_else(|| basename_of(&normalized).to_string());
        let kind = options
            .last_known_file_type
            .clone()
            .unwrap_or_else(|| detect_type(&normalized).to_string());

        let mut group = Some(detect_group(&basename, &kind, options).to_string());

        let dirname = options
            .custom_framework
            .then(|| dirname_of(&normalized).to_string());

        let mut file_path = if options.custom_framework {
            Some(normalized.clone())
        } else if let Some(prefix) = path_prefix_for_file_type(&kind) {
            Some(format!("{prefix}{}", basename_of(&normalized)))
        } else {
            Some(normalized.clone())
        };

        let mut file_encoding = options
            .default_encoding
            .or_else(|| encoding_for_file_type(&kind));
        let mut last_known_file_type = Some(kind);

        if let Some(explicit) = &options.explicit_file_type {
            let known = last_known_file_type
                .as_deref()
                .filter(|known| *known != DEFAULT_FILE_TYPE)
                .unwrap_or(explicit.as_str());
            if let Some(extension) = extension_for_file_type(known) {
                basename = format!("{basename}.{extension}");
            }
            file_path = None;
            last_known_file_type = None;
            group = None;
            file_encoding = None;
        }

        let source_tree = options.source_tree.clone().unwrap_or_else(|| {
            let table_tree = last_known_file_type
                .as_deref()
                .and_then(source_tree_for_file_type);
            if options.explicit_file_type.is_some() {
                PRODUCT_SOURCE_TREE.to_string()
            } else if options.custom_framework {
                DEFAULT_SOURCE_TREE.to_string()
            } else {
                table_tree.unwrap_or(DEFAULT_SOURCE_TREE).to_string()
            }
        });

        let mut settings = BuildFileSettings::default();
        if options.weak {
            settings.attributes.push("Weak".to_string());
        }
        if let Some(flags) = &options.compiler_flags {
            settings.compiler_flags = Some(flags.clone());
        }
        if options.embed && options.sign {
            settings.attributes.push("CodeSignOnCopy".to_string());
        }

        if let Some(override_group) = &options.group {
            group = Some(override_group.clone());
        }

        Self {
            basename,
            path: file_path,
            last_known_file_type,
            explicit_file_type: options.explicit_file_type.clone(),
            group,
            source_tree,
            file_encoding,
            custom_framework: options.custom_framework,
            dirname,
            plugin: options.plugin,
            settings,
            target: options.target.clone(),
            file_ref: None,
            uuid: None,
        }
    }

    /// Kind used for routing: the detected kind, else the explicit one.
    pub fn kind(&self) -> &str {
        self.last_known_file_type
            .as_deref()
            .or(self.explicit_file_type.as_deref())
            .unwrap_or(DEFAULT_FILE_TYPE)
    }

    /// Build-phase group name, falling back to `Resources`.
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    /// Comment used for build files and build-phase entries.
    pub fn long_comment(&self) -> String {
        format!("{} in {}", self.basename, self.group_name())
    }

    /// Recorded path, falling back to the display name.
    pub fn path_or_basename(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.basename)
    }

    /// Group child entry pointing at this file's reference.
    pub fn group_child(&self) -> Option<ObjectRef> {
        self.file_ref
            .as_ref()
            .map(|id| ObjectRef::new(id.clone(), self.basename.clone()))
    }

    /// Build-phase entry pointing at this file's build file.
    pub fn phase_entry(&self) -> Option<ObjectRef> {
        self.uuid
            .as_ref()
            .map(|id| ObjectRef::new(id.clone(), self.long_comment()))
    }

    /// Fields of the `PBXFileReference` record for this file.
    pub fn file_reference_fields(&self) -> Dict {
        let mut fields = Dict::new().with("isa", "PBXFileReference");
        if let Some(explicit) = &self.explicit_file_type {
            fields.insert("explicitFileType", explicit.as_str());
        }
        if let Some(encoding) = self.file_encoding {
            fields.insert("fileEncoding", encoding);
        }
        if self.explicit_file_type.is_some() {
            fields.insert("includeInIndex", 0u32);
        }
        if let Some(kind) = &self.last_known_file_type {
            fields.insert("lastKnownFileType", kind.as_str());
        }
        if self.path.as_deref() != Some(self.basename.as_str()) {
            fields.insert("name", self.basename.as_str());
        }
        if let Some(path) = &self.path {
            fields.insert("path", path.as_str());
        }
        fields.insert("sourceTree", self.source_tree.as_str());
        fields
    }

    /// Fields of the `PBXBuildFile` record for this file.
    pub fn build_file_fields(&self) -> Option<Dict> {
        let reference = self.group_child()?;
        let mut fields = Dict::new()
            .with("isa", "PBXBuildFile")
            .with("fileRef", reference);
        if !self.settings.is_empty() {
            fields.insert("settings", self.settings.to_dict());
        }
        Some(fields)
    }
}

/// A data-model bundle together with its version files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModelDescriptor {
    pub file: FileDescriptor,
    pub models: Vec<FileDescriptor>,
    pub current_model: Option<ObjectId>,
}

fn detect_type(path: &str) -> &'static str {
    file_type_for_extension(extension_of(basename_of(path))).unwrap_or(DEFAULT_FILE_TYPE)
}

fn detect_group(basename: &str, kind: &str, options: &FileOptions) -> &'static str {
    if extension_of(basename) == "xcdatamodeld" {
        return "Sources";
    }
    if options.custom_framework && options.embed {
        return group_for_file_type("embedded.framework");
    }
    group_for_file_type(kind)
}

/// Last path component, ignoring trailing separators.
pub fn basename_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// Parent path, `.` for a bare name.
pub fn dirname_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(index) => &trimmed[..index],
        None => ".",
    }
}

/// Extension without the dot; dot-files have none.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[index + 1..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objc_source_goes_to_sources_with_default_encoding() {
        let file = FileDescriptor::classify("Foo.m", &FileOptions::default());
        assert_eq!(file.kind(), "sourcecode.c.objc");
        assert_eq!(file.group.as_deref(), Some("Sources"));
        assert_eq!(file.file_encoding, Some(4));
        assert_eq!(file.source_tree, "<group>");
        assert_eq!(file.long_comment(), "Foo.m in Sources");
    }

    #[test]
    fn system_framework_is_sdk_relative() {
        let file = FileDescriptor::classify("libz.tbd", &FileOptions::default());
        assert_eq!(file.path.as_deref(), Some("usr/lib/libz.tbd"));
        assert_eq!(file.source_tree, "SDKROOT");
        assert_eq!(file.group.as_deref(), Some("Frameworks"));
    }

    #[test]
    fn custom_framework_keeps_raw_path_and_dirname() {
        let options = FileOptions {
            custom_framework: true,
            ..FileOptions::default()
        };
        let file = FileDescriptor::classify("Vendor/Foo.framework", &options);
        assert_eq!(file.path.as_deref(), Some("Vendor/Foo.framework"));
        assert_eq!(file.dirname.as_deref(), Some("Vendor"));
        assert_eq!(file.source_tree, "<group>");
    }

    #[test]
    fn embedded_signed_framework_gets_code_sign_attribute() {
        let options = FileOptions {
            custom_framework: true,
            embed: true,
            sign: true,
            ..FileOptions::default()
        };
        let file = FileDescriptor::classify("libfoo.a", &options);
        assert_eq!(file.group.as_deref(), Some("Embed Frameworks"));
        assert_eq!(file.settings.attributes, vec!["CodeSignOnCopy".to_string()]);
    }

    #[test]
    fn explicit_type_derives_product_name_and_drops_path() {
        let options = FileOptions {
            explicit_file_type: Some("wrapper.app-extension".to_string()),
            ..FileOptions::default()
        };
        let file = FileDescriptor::classify("Widget", &options);
        assert_eq!(file.basename, "Widget.appex");
        assert!(file.path.is_none());
        assert!(file.group.is_none());
        assert!(file.last_known_file_type.is_none());
        assert_eq!(file.source_tree, "BUILT_PRODUCTS_DIR");
    }

    #[test]
    fn unknown_extension_falls_back_to_defaults() {
        let file = FileDescriptor::classify("Main.storyboard", &FileOptions::default());
        assert_eq!(file.kind(), "unknown");
        assert_eq!(file.group.as_deref(), Some("Resources"));
        assert_eq!(file.file_encoding, None);
    }

    #[test]
    fn weak_and_compiler_flags_land_in_settings() {
        let options = FileOptions {
            weak: true,
            compiler_flags: Some("-fno-objc-arc".to_string()),
            ..FileOptions::default()
        };
        let file = FileDescriptor::classify("Foo.m", &options);
        let settings = file.settings.to_dict();
        assert_eq!(settings.get_array("ATTRIBUTES").map(Vec::len), Some(1));
        assert_eq!(settings.get_str("COMPILER_FLAGS"), Some("-fno-objc-arc"));
    }

    #[test]
    fn path_helpers_follow_posix_rules() {
        assert_eq!(basename_of("a/b/c.m"), "c.m");
        assert_eq!(dirname_of("c.m"), ".");
        assert_eq!(dirname_of("a/b/c.m"), "a/b");
        assert_eq!(extension_of(".xccurrentversion"), "");
        assert_eq!(extension_of("Model.xcdatamodeld"), "xcdatamodeld");
    }

    #[test]
    fn options_serialize_with_snake_case_fields() {
        let options = FileOptions {
            custom_framework: true,
            ..FileOptions::default()
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["custom_framework"], serde_json::Value::Bool(true));
        let parsed: FileOptions = serde_json::from_str(r#"{"weak": true}"#).unwrap();
        assert!(parsed.weak);
        assert!(!parsed.embed);
    }
}
