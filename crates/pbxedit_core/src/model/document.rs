//! In-memory project document: top-level properties plus per-`isa` sections.
//!
//! # Responsibility
//! - Own every record of one manifest, grouped by `isa`.
//! - Keep both record order and lookup by id for each section.
//!
//! # Invariants
//! - A record id appears in at most one section.
//! - Each section's `order` lists exactly the keys of its `records`.
//! - Sections are kept sorted by `isa` when new ones are created.

use crate::model::value::{Dict, ObjectId};
use std::collections::{HashMap, HashSet};

/// The section kinds the editor understands.
///
/// Sections with any other `isa` are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    BuildFile,
    FileReference,
    Group,
    VariantGroup,
    NativeTarget,
    Project,
    SourcesBuildPhase,
    ResourcesBuildPhase,
    FrameworksBuildPhase,
    CopyFilesBuildPhase,
    ShellScriptBuildPhase,
    TargetDependency,
    ContainerItemProxy,
    BuildConfiguration,
    ConfigurationList,
    VersionGroup,
}

impl SectionKind {
    pub const ALL: [SectionKind; 16] = [
        Self::BuildFile,
        Self::FileReference,
        Self::Group,
        Self::VariantGroup,
        Self::NativeTarget,
        Self::Project,
        Self::SourcesBuildPhase,
        Self::ResourcesBuildPhase,
        Self::FrameworksBuildPhase,
        Self::CopyFilesBuildPhase,
        Self::ShellScriptBuildPhase,
        Self::TargetDependency,
        Self::ContainerItemProxy,
        Self::BuildConfiguration,
        Self::ConfigurationList,
        Self::VersionGroup,
    ];

    /// Build-phase sections, in the order phases are searched.
    pub const PHASES: [SectionKind; 5] = [
        Self::SourcesBuildPhase,
        Self::ResourcesBuildPhase,
        Self::FrameworksBuildPhase,
        Self::CopyFilesBuildPhase,
        Self::ShellScriptBuildPhase,
    ];

    pub fn isa(self) -> &'static str {
        match self {
            Self::BuildFile => "PBXBuildFile",
            Self::FileReference => "PBXFileReference",
            Self::Group => "PBXGroup",
            Self::VariantGroup => "PBXVariantGroup",
            Self::NativeTarget => "PBXNativeTarget",
            Self::Project => "PBXProject",
            Self::SourcesBuildPhase => "PBXSourcesBuildPhase",
            Self::ResourcesBuildPhase => "PBXResourcesBuildPhase",
            Self::FrameworksBuildPhase => "PBXFrameworksBuildPhase",
            Self::CopyFilesBuildPhase => "PBXCopyFilesBuildPhase",
            Self::ShellScriptBuildPhase => "PBXShellScriptBuildPhase",
            Self::TargetDependency => "PBXTargetDependency",
            Self::ContainerItemProxy => "PBXContainerItemProxy",
            Self::BuildConfiguration => "XCBuildConfiguration",
            Self::ConfigurationList => "XCConfigurationList",
            Self::VersionGroup => "XCVersionGroup",
        }
    }

    pub fn from_isa(isa: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.isa() == isa)
    }

    /// Display name the host tool gives the default phase of this kind.
    pub fn default_phase_name(self) -> Option<&'static str> {
        match self {
            Self::SourcesBuildPhase => Some("Sources"),
            Self::ResourcesBuildPhase => Some("Resources"),
            Self::FrameworksBuildPhase => Some("Frameworks"),
            Self::CopyFilesBuildPhase => Some("Copy Files"),
            _ => None,
        }
    }
}

/// One object of the `objects` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: ObjectId,
    /// Display name rendered next to the id; `None` when the source had none.
    pub comment: Option<String>,
    pub fields: Dict,
}

impl Record {
    pub fn new(id: ObjectId, comment: impl Into<String>, fields: Dict) -> Self {
        Self {
            id,
            comment: Some(comment.into()),
            fields,
        }
    }

    pub fn isa(&self) -> Option<&str> {
        self.fields.get_str("isa")
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get_str(key)
    }
}

/// All records sharing one `isa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    isa: String,
    order: Vec<ObjectId>,
    records: HashMap<ObjectId, Record>,
}

impl Section {
    pub fn new(isa: impl Into<String>) -> Self {
        Self {
            isa: isa.into(),
            order: Vec::new(),
            records: HashMap::new(),
        }
    }

    pub fn isa(&self) -> &str {
        &self.isa
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Inserts a record, replacing an existing one with the same id in place.
    pub fn insert(&mut self, record: Record) {
        if !self.records.contains_key(record.id.as_str()) {
            self.order.push(record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.records.remove(id)?;
        self.order.retain(|existing| existing.as_str() != id);
        Some(record)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.order.iter()
    }

    /// Records in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn first(&self) -> Option<&Record> {
        self.iter().next()
    }

    /// Mutable access to every record, in no particular order.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }
}

/// A whole project manifest.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Top-level entries other than `objects`, in source order.
    pub properties: Dict,
    sections: Vec<Section>,
    /// Ids handed out by the allocator, including ones not yet inserted.
    pub(crate) allocated: HashSet<ObjectId>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties && self.sections == other.sections
    }
}

impl Eq for Document {}

impl Document {
    pub fn new(properties: Dict) -> Self {
        Self {
            properties,
            sections: Vec::new(),
            allocated: HashSet::new(),
        }
    }

    /// Id of the root `PBXProject` object.
    pub fn root_object(&self) -> Option<&str> {
        self.properties.get_str("rootObject")
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.section_by_isa(kind.isa())
    }

    pub fn section_by_isa(&self, isa: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.isa == isa)
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.isa == kind.isa())
    }

    /// Appends a section as parsed; used by the parser to keep source order.
    pub(crate) fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub(crate) fn section_by_isa_mut(&mut self, isa: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|section| section.isa == isa)
    }

    /// Returns the section for `isa`, creating it at its sorted position.
    pub fn section_entry(&mut self, isa: &str) -> &mut Section {
        let index = match self.sections.iter().position(|section| section.isa == isa) {
            Some(index) => index,
            None => {
                let index = self
                    .sections
                    .iter()
                    .position(|section| section.isa.as_str() > isa)
                    .unwrap_or(self.sections.len());
                self.sections.insert(index, Section::new(isa));
                index
            }
        };
        &mut self.sections[index]
    }

    pub fn record(&self, kind: SectionKind, id: &str) -> Option<&Record> {
        self.section(kind).and_then(|section| section.get(id))
    }

    pub fn record_mut(&mut self, kind: SectionKind, id: &str) -> Option<&mut Record> {
        self.section_mut(kind).and_then(|section| section.get_mut(id))
    }

    pub fn records(&self, kind: SectionKind) -> impl Iterator<Item = &Record> {
        self.section(kind).into_iter().flat_map(Section::iter)
    }

    pub fn insert_record(&mut self, kind: SectionKind, record: Record) {
        self.section_entry(kind.isa()).insert(record);
    }

    pub fn remove_record(&mut self, kind: SectionKind, id: &str) -> Option<Record> {
        self.section_mut(kind).and_then(|section| section.remove(id))
    }

    /// Looks an id up across every section.
    pub fn find_record(&self, id: &str) -> Option<&Record> {
        self.sections.iter().find_map(|section| section.get(id))
    }

    /// Returns the known kind of the section holding `id`.
    pub fn kind_of(&self, id: &str) -> Option<SectionKind> {
        self.sections
            .iter()
            .find(|section| section.contains(id))
            .and_then(|section| SectionKind::from_isa(&section.isa))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.sections.iter().any(|section| section.contains(id))
    }

    /// Mutable access to every record of every section.
    pub(crate) fn all_records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.sections.iter_mut().flat_map(Section::records_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, Record, SectionKind};
    use crate::model::value::{Dict, ObjectId};

    #[test]
    fn new_sections_are_inserted_in_isa_order() {
        let mut document = Document::default();
        document.section_entry("PBXProject");
        document.section_entry("PBXBuildFile");
        document.section_entry("XCConfigurationList");
        document.section_entry("PBXGroup");

        let order: Vec<&str> = document.sections().iter().map(|s| s.isa()).collect();
        assert_eq!(
            order,
            vec!["PBXBuildFile", "PBXGroup", "PBXProject", "XCConfigurationList"]
        );
    }

    #[test]
    fn remove_record_drops_order_entry() {
        let mut document = Document::default();
        let id = ObjectId::from("AAAAAAAAAAAAAAAAAAAAAAAA");
        document.insert_record(
            SectionKind::Group,
            Record::new(id.clone(), "Sources", Dict::new().with("isa", "PBXGroup")),
        );
        assert_eq!(document.kind_of(id.as_str()), Some(SectionKind::Group));

        document.remove_record(SectionKind::Group, id.as_str());
        let section = document.section(SectionKind::Group).unwrap();
        assert!(section.is_empty());
        assert_eq!(section.ids().count(), 0);
    }

    #[test]
    fn isa_names_round_trip() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_isa(kind.isa()), Some(kind));
        }
        assert_eq!(SectionKind::from_isa("PBXLegacyTarget"), None);
    }
}
