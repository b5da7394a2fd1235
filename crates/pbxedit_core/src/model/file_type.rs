//! File-kind lookup tables.
//!
//! Extension order matters for the reverse lookup: the first extension listed
//! for a kind is the one products get.

pub const DEFAULT_SOURCE_TREE: &str = "<group>";
pub const PRODUCT_SOURCE_TREE: &str = "BUILT_PRODUCTS_DIR";
pub const SDK_SOURCE_TREE: &str = "SDKROOT";
pub const DEFAULT_FILE_TYPE: &str = "unknown";
pub const DEFAULT_GROUP: &str = "Resources";
pub const DEFAULT_ENCODING: u32 = 4;

pub const ASSET_CATALOG: &str = "folder.assetcatalog";
pub const PLIST: &str = "text.plist.xml";
pub const MODULE_MAP: &str = "sourcecode.module-map";
pub const DATA_MODEL: &str = "wrapper.xcdatamodel";

static FILE_TYPES: &[(&str, &str)] = &[
    ("a", "archive.ar"),
    ("app", "wrapper.application"),
    ("appex", "wrapper.app-extension"),
    ("bundle", "wrapper.plug-in"),
    ("c", "sourcecode.c.c"),
    ("cc", "sourcecode.cpp.cpp"),
    ("cpp", "sourcecode.cpp.cpp"),
    ("cxx", "sourcecode.cpp.cpp"),
    ("c++", "sourcecode.cpp.cpp"),
    ("dylib", "compiled.mach-o.dylib"),
    ("framework", "wrapper.framework"),
    ("h", "sourcecode.c.h"),
    ("hh", "sourcecode.cpp.h"),
    ("hpp", "sourcecode.cpp.h"),
    ("hxx", "sourcecode.cpp.h"),
    ("h++", "sourcecode.cpp.h"),
    ("m", "sourcecode.c.objc"),
    ("mm", "sourcecode.cpp.objcpp"),
    ("markdown", "text"),
    ("mdimporter", "wrapper.cfbundle"),
    ("octest", "wrapper.cfbundle"),
    ("pch", "sourcecode.c.h"),
    ("plist", "text.plist.xml"),
    ("entitlements", "text.plist.entitlements"),
    ("png", "image.png"),
    ("sh", "text.script.sh"),
    ("swift", "sourcecode.swift"),
    ("tbd", "sourcecode.text-based-dylib-definition"),
    ("xcassets", "folder.assetcatalog"),
    ("xcconfig", "text.xcconfig"),
    ("xcdatamodel", "wrapper.xcdatamodel"),
    ("xcodeproj", "wrapper.pb-project"),
    ("xctest", "wrapper.cfbundle"),
    ("xib", "file.xib"),
    ("strings", "text.plist.strings"),
    ("modulemap", "sourcecode.module-map"),
];

/// Kind for a file extension (without the dot).
pub fn file_type_for_extension(extension: &str) -> Option<&'static str> {
    FILE_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == extension)
        .map(|(_, kind)| *kind)
}

/// Canonical extension for a kind.
pub fn extension_for_file_type(kind: &str) -> Option<&'static str> {
    FILE_TYPES
        .iter()
        .find(|(_, candidate)| *candidate == kind)
        .map(|(extension, _)| *extension)
}

/// Build-phase group a kind belongs to by default.
pub fn group_for_file_type(kind: &str) -> &'static str {
    match kind {
        "archive.ar"
        | "compiled.mach-o.dylib"
        | "sourcecode.text-based-dylib-definition"
        | "wrapper.framework" => "Frameworks",
        "embedded.framework" => "Embed Frameworks",
        "sourcecode.c.h" => "Resources",
        "sourcecode.c.c"
        | "sourcecode.c.objc"
        | "sourcecode.swift"
        | "sourcecode.cpp.cpp"
        | "sourcecode.cpp.objcpp" => "Sources",
        _ => DEFAULT_GROUP,
    }
}

/// SDK-relative directory prefix for system libraries and frameworks.
pub fn path_prefix_for_file_type(kind: &str) -> Option<&'static str> {
    match kind {
        "compiled.mach-o.dylib" | "sourcecode.text-based-dylib-definition" => Some("usr/lib/"),
        "wrapper.framework" => Some("System/Library/Frameworks/"),
        _ => None,
    }
}

pub fn source_tree_for_file_type(kind: &str) -> Option<&'static str> {
    path_prefix_for_file_type(kind).map(|_| SDK_SOURCE_TREE)
}

pub fn encoding_for_file_type(kind: &str) -> Option<u32> {
    match kind {
        "sourcecode.c.h"
        | "sourcecode.cpp.h"
        | "sourcecode.c.c"
        | "sourcecode.c.objc"
        | "sourcecode.cpp.cpp"
        | "sourcecode.cpp.objcpp"
        | "sourcecode.swift"
        | "text"
        | "text.plist.xml"
        | "text.script.sh"
        | "text.xcconfig"
        | "text.plist.strings" => Some(DEFAULT_ENCODING),
        _ => None,
    }
}

pub fn is_header(kind: &str) -> bool {
    kind.ends_with(".h")
}

pub fn is_source(kind: &str) -> bool {
    kind.starts_with("sourcecode.") && !is_header(kind)
}

pub fn is_asset_catalog(kind: &str) -> bool {
    kind == ASSET_CATALOG
}

pub fn is_entitlements(kind: &str) -> bool {
    kind.ends_with(".entitlements")
}

pub fn is_plist(kind: &str) -> bool {
    kind == PLIST
}

pub fn is_module_map(kind: &str) -> bool {
    kind == MODULE_MAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_lookup_prefers_canonical_extension() {
        assert_eq!(extension_for_file_type("sourcecode.cpp.cpp"), Some("cc"));
        assert_eq!(extension_for_file_type("sourcecode.cpp.h"), Some("hh"));
        assert_eq!(extension_for_file_type("sourcecode.c.h"), Some("h"));
        assert_eq!(extension_for_file_type("wrapper.cfbundle"), Some("mdimporter"));
        assert_eq!(extension_for_file_type("archive.ar"), Some("a"));
    }

    #[test]
    fn module_map_is_source_kind_but_routed_separately() {
        assert!(is_source(MODULE_MAP));
        assert!(is_module_map(MODULE_MAP));
        assert!(!is_source("sourcecode.cpp.h"));
    }

    #[test]
    fn system_libraries_are_sdk_relative() {
        assert_eq!(path_prefix_for_file_type("wrapper.framework"), Some("System/Library/Frameworks/"));
        assert_eq!(source_tree_for_file_type("compiled.mach-o.dylib"), Some(SDK_SOURCE_TREE));
        assert_eq!(source_tree_for_file_type("archive.ar"), None);
    }

    #[test]
    fn unmatched_kinds_default_to_resources() {
        assert_eq!(group_for_file_type("image.png"), DEFAULT_GROUP);
        assert_eq!(group_for_file_type(DEFAULT_FILE_TYPE), DEFAULT_GROUP);
        assert_eq!(group_for_file_type("sourcecode.swift"), "Sources");
    }
}
