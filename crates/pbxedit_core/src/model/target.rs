//! Target, build-phase and configuration shapes used when creating records.

use crate::model::document::SectionKind;
use crate::model::value::Dict;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Product kinds a new target may be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Application,
    AppExtension,
    Bundle,
    CommandLineTool,
    DynamicLibrary,
    Framework,
    StaticLibrary,
    UnitTestBundle,
    WatchApp,
    WatchExtension,
}

impl TargetType {
    pub const ALL: [TargetType; 10] = [
        Self::Application,
        Self::AppExtension,
        Self::Bundle,
        Self::CommandLineTool,
        Self::DynamicLibrary,
        Self::Framework,
        Self::StaticLibrary,
        Self::UnitTestBundle,
        Self::WatchApp,
        Self::WatchExtension,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::AppExtension => "app_extension",
            Self::Bundle => "bundle",
            Self::CommandLineTool => "command_line_tool",
            Self::DynamicLibrary => "dynamic_library",
            Self::Framework => "framework",
            Self::StaticLibrary => "static_library",
            Self::UnitTestBundle => "unit_test_bundle",
            Self::WatchApp => "watch_app",
            Self::WatchExtension => "watch_extension",
        }
    }

    pub fn product_type(self) -> &'static str {
        match self {
            Self::Application => "com.apple.product-type.application",
            Self::AppExtension => "com.apple.product-type.app-extension",
            Self::Bundle => "com.apple.product-type.bundle",
            Self::CommandLineTool => "com.apple.product-type.tool",
            Self::DynamicLibrary => "com.apple.product-type.library.dynamic",
            Self::Framework => "com.apple.product-type.framework",
            Self::StaticLibrary => "com.apple.product-type.library.static",
            Self::UnitTestBundle => "com.apple.product-type.bundle.unit-test",
            Self::WatchApp => "com.apple.product-type.application.watchapp2",
            Self::WatchExtension => "com.apple.product-type.watchkit2-extension",
        }
    }

    /// File kind of the product reference.
    pub fn product_file_type(self) -> &'static str {
        match self {
            Self::Application | Self::WatchApp => "wrapper.application",
            Self::AppExtension | Self::WatchExtension => "wrapper.app-extension",
            Self::Bundle => "wrapper.plug-in",
            Self::CommandLineTool | Self::DynamicLibrary => "compiled.mach-o.dylib",
            Self::Framework => "wrapper.framework",
            Self::StaticLibrary => "archive.ar",
            Self::UnitTestBundle => "wrapper.cfbundle",
        }
    }

    /// Where a copy-files phase embedding this product copies it to.
    pub fn copy_destination(self) -> CopyDestination {
        match self {
            Self::Application | Self::Bundle | Self::CommandLineTool | Self::UnitTestBundle => {
                CopyDestination::Wrapper
            }
            Self::AppExtension | Self::WatchExtension => CopyDestination::Plugins,
            Self::DynamicLibrary | Self::StaticLibrary | Self::WatchApp => {
                CopyDestination::ProductsDirectory
            }
            Self::Framework => CopyDestination::SharedFrameworks,
        }
    }

    /// Extension and watch products are embedded into their parent target.
    pub fn embeds_in_parent(self) -> bool {
        matches!(
            self,
            Self::AppExtension | Self::WatchExtension | Self::WatchApp
        )
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

/// `dstSubfolderSpec` destinations of a copy-files phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyDestination {
    AbsolutePath,
    Wrapper,
    Executables,
    Resources,
    Frameworks,
    SharedFrameworks,
    SharedSupport,
    Plugins,
    JavaResources,
    ProductsDirectory,
    XpcServices,
}

impl CopyDestination {
    pub fn subfolder_spec(self) -> u32 {
        match self {
            Self::AbsolutePath | Self::XpcServices => 0,
            Self::Wrapper => 1,
            Self::Executables => 6,
            Self::Resources => 7,
            Self::Frameworks => 10,
            Self::SharedFrameworks => 11,
            Self::SharedSupport => 12,
            Self::Plugins => 13,
            Self::JavaResources => 15,
            Self::ProductsDirectory => 16,
        }
    }
}

/// Fields of a new shell-script phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellScriptOptions {
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,
    pub shell_path: String,
    pub shell_script: String,
}

impl Default for ShellScriptOptions {
    fn default() -> Self {
        Self {
            input_paths: Vec::new(),
            output_paths: Vec::new(),
            shell_path: "/bin/sh".to_string(),
            shell_script: String::new(),
        }
    }
}

/// A build phase to create, with its kind-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseSpec {
    Sources,
    Resources,
    Frameworks,
    CopyFiles {
        destination: CopyDestination,
        dst_path: String,
    },
    ShellScript(ShellScriptOptions),
}

impl PhaseSpec {
    pub fn section_kind(&self) -> SectionKind {
        match self {
            Self::Sources => SectionKind::SourcesBuildPhase,
            Self::Resources => SectionKind::ResourcesBuildPhase,
            Self::Frameworks => SectionKind::FrameworksBuildPhase,
            Self::CopyFiles { .. } => SectionKind::CopyFilesBuildPhase,
            Self::ShellScript(_) => SectionKind::ShellScriptBuildPhase,
        }
    }
}

/// A build configuration to create under a new configuration list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSpec {
    pub name: String,
    pub build_settings: Dict,
}

impl ConfigurationSpec {
    pub fn new(name: impl Into<String>, build_settings: Dict) -> Self {
        Self {
            name: name.into(),
            build_settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CopyDestination, TargetType};

    #[test]
    fn target_types_parse_from_snake_case() {
        for kind in TargetType::ALL {
            assert_eq!(kind.as_str().parse::<TargetType>(), Ok(kind));
        }
        assert_eq!("widget".parse::<TargetType>(), Err("widget".to_string()));
    }

    #[test]
    fn extensions_embed_as_plugins() {
        assert_eq!(
            TargetType::AppExtension.copy_destination(),
            CopyDestination::Plugins
        );
        assert_eq!(CopyDestination::Plugins.subfolder_spec(), 13);
        assert!(TargetType::WatchApp.embeds_in_parent());
        assert!(!TargetType::StaticLibrary.embeds_in_parent());
    }
}
