//! Typed lookups over document sections.

use crate::model::document::{Document, Record, SectionKind};
use crate::model::value::{is_well_formed_id, unquote, ObjectId, Value};
use serde::Serialize;

/// A reference whose id has no record anywhere in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// Record holding the reference; `None` for top-level properties.
    pub owner: Option<ObjectId>,
    pub field: String,
    pub id: ObjectId,
}

impl Document {
    /// The first `PBXProject` record.
    pub fn first_project(&self) -> Option<&Record> {
        self.section(SectionKind::Project).and_then(|section| section.first())
    }

    pub(crate) fn first_project_mut(&mut self) -> Option<&mut Record> {
        let id = self.first_project()?.id.clone();
        self.record_mut(SectionKind::Project, id.as_str())
    }

    /// Id of the first entry in the project's `targets` list.
    pub fn first_target_id(&self) -> Option<ObjectId> {
        self.first_project()?
            .fields
            .get_array("targets")?
            .first()
            .and_then(Value::as_str)
            .map(ObjectId::from)
    }

    pub fn native_target(&self, id: &str) -> Option<&Record> {
        self.record(SectionKind::NativeTarget, id)
    }

    /// First record of `kind` whose display comment equals `comment`.
    pub fn item_by_comment(&self, kind: SectionKind, comment: &str) -> Option<&Record> {
        self.records(kind)
            .find(|record| record.comment() == Some(comment))
    }

    /// Id of the native target whose `name` field equals `name`.
    pub fn target_key_by_name(&self, name: &str) -> Option<ObjectId> {
        self.records(SectionKind::NativeTarget)
            .find(|record| record.fields.get("name").is_some_and(|value| value.is_str(name)))
            .map(|record| record.id.clone())
    }

    /// File reference whose `path` equals `path`, quoted or bare.
    pub fn file_reference_by_path(&self, path: &str) -> Option<&Record> {
        self.records(SectionKind::FileReference)
            .find(|record| record.fields.get("path").is_some_and(|value| value.is_str(path)))
    }

    /// File reference whose `name` equals `name`, quoted or bare.
    pub fn file_reference_by_name(&self, name: &str) -> Option<&Record> {
        self.records(SectionKind::FileReference)
            .find(|record| record.fields.get("name").is_some_and(|value| value.is_str(name)))
    }

    /// Build files whose `fileRef` points at `file_ref`.
    pub fn build_files_referencing(&self, file_ref: &str) -> Vec<ObjectId> {
        self.records(SectionKind::BuildFile)
            .filter(|record| record.get_str("fileRef") == Some(file_ref))
            .map(|record| record.id.clone())
            .collect()
    }

    /// Configuration ids listed by the configuration list of `target`.
    pub fn configuration_ids_for_target(&self, target: &str) -> Vec<ObjectId> {
        let Some(list_id) = self
            .native_target(target)
            .and_then(|record| record.get_str("buildConfigurationList"))
        else {
            return Vec::new();
        };
        self.record(SectionKind::ConfigurationList, list_id)
            .and_then(|list| list.fields.get_array("buildConfigurations"))
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ObjectId::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First `PRODUCT_NAME` found across build configurations, unquoted.
    pub fn product_name(&self) -> Option<String> {
        self.records(SectionKind::BuildConfiguration)
            .find_map(|record| {
                record
                    .fields
                    .get_dict("buildSettings")
                    .and_then(|settings| settings.get_str("PRODUCT_NAME"))
            })
            .map(|name| unquote(name).to_string())
    }

    /// Every id-shaped value that resolves to no record.
    pub fn unresolved_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for (key, value) in self.properties.iter() {
            collect_dangling(self, None, key, value, &mut dangling);
        }
        for section in self.sections() {
            for record in section.iter() {
                for (key, value) in record.fields.iter() {
                    collect_dangling(self, Some(&record.id), key, value, &mut dangling);
                }
            }
        }
        dangling
    }
}

fn collect_dangling(
    document: &Document,
    owner: Option<&ObjectId>,
    field: &str,
    value: &Value,
    dangling: &mut Vec<DanglingReference>,
) {
    match value {
        Value::String(_) | Value::Ref(_) => {
            let Some(text) = value.as_str() else {
                return;
            };
            if is_well_formed_id(text) && !document.contains_id(text) {
                dangling.push(DanglingReference {
                    owner: owner.cloned(),
                    field: field.to_string(),
                    id: ObjectId::from(text),
                });
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_dangling(document, owner, field, item, dangling);
            }
        }
        Value::Dict(dict) => {
            for (key, item) in dict.iter() {
                collect_dangling(document, owner, key, item, dangling);
            }
        }
    }
}
