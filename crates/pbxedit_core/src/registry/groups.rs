//! Group lookups and child-list edits.

use crate::model::document::{Document, Record, SectionKind};
use crate::model::file_type::DEFAULT_SOURCE_TREE;
use crate::model::value::{Dict, ObjectId, ObjectRef, Value};

/// Name and path filter for [`Document::find_group_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCriteria<'a> {
    pub name: Option<&'a str>,
    pub path: Option<&'a str>,
}

impl<'a> GroupCriteria<'a> {
    pub fn name(name: &'a str) -> Self {
        Self {
            name: Some(name),
            path: None,
        }
    }

    pub fn path(path: &'a str) -> Self {
        Self {
            name: None,
            path: Some(path),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        let field_is = |key: &str, expected: &str| {
            record
                .fields
                .get(key)
                .is_some_and(|value| value.is_str(expected))
        };
        match (self.name, self.path) {
            (Some(name), Some(path)) => field_is("name", name) && field_is("path", path),
            (None, Some(path)) => field_is("path", path),
            (Some(name), None) => field_is("name", name),
            (None, None) => false,
        }
    }
}

impl Document {
    /// `PBXGroup` whose display comment equals `name`.
    pub fn group_by_name(&self, name: &str) -> Option<&Record> {
        self.item_by_comment(SectionKind::Group, name)
    }

    pub fn group_key_by_name(&self, name: &str) -> Option<ObjectId> {
        self.group_by_name(name).map(|record| record.id.clone())
    }

    /// First group of `kind` matching `criteria`; both fields must match
    /// when both are given.
    pub fn find_group_key(&self, kind: SectionKind, criteria: &GroupCriteria<'_>) -> Option<ObjectId> {
        self.records(kind)
            .find(|record| criteria.matches(record))
            .map(|record| record.id.clone())
    }

    /// The project's `mainGroup`, else the only group with neither name nor path.
    pub fn main_group_id(&self) -> Option<ObjectId> {
        if let Some(id) = self
            .first_project()
            .and_then(|project| project.get_str("mainGroup"))
        {
            return Some(ObjectId::from(id));
        }
        self.records(SectionKind::Group)
            .find(|record| !record.fields.contains_key("name") && !record.fields.contains_key("path"))
            .map(|record| record.id.clone())
    }

    /// Inserts an empty group record and returns its id.
    pub fn create_group_record(
        &mut self,
        kind: SectionKind,
        name: &str,
        path: Option<&str>,
    ) -> ObjectId {
        let id = self.allocate_id();
        let mut fields = Dict::new()
            .with("isa", kind.isa())
            .with("children", Vec::<Value>::new())
            .with("name", name);
        if let Some(path) = path {
            fields.insert("path", path);
        }
        fields.insert("sourceTree", DEFAULT_SOURCE_TREE);
        self.insert_record(kind, Record::new(id.clone(), name, fields));
        id
    }

    /// Appends `child` to a group or variant group. Returns `false` when no
    /// such group exists.
    pub fn add_group_child(&mut self, group: &str, child: ObjectRef) -> bool {
        let Some(record) = self.group_record_mut(group) else {
            return false;
        };
        record.fields.entry_array("children").push(Value::Ref(child));
        true
    }

    /// Removes the child matching both id and comment. Returns whether an
    /// entry was removed.
    pub fn remove_group_child(&mut self, group: &str, child: &ObjectRef) -> bool {
        let Some(children) = self
            .group_record_mut(group)
            .and_then(|record| record.fields.get_array_mut("children"))
        else {
            return false;
        };
        let position = children.iter().position(|item| {
            item.as_ref_value()
                .is_some_and(|existing| existing.id == child.id && existing.comment == child.comment)
        });
        match position {
            Some(index) => {
                children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Strips every child entry pointing at `id` from all groups.
    pub fn unlink_from_all_groups(&mut self, id: &str) {
        for kind in [SectionKind::Group, SectionKind::VariantGroup] {
            let Some(section) = self.section_mut(kind) else {
                continue;
            };
            for record in section.records_mut() {
                if let Some(children) = record.fields.get_array_mut("children") {
                    children.retain(|child| child.as_str() != Some(id));
                }
            }
        }
    }

    /// Ids of the groups (plain or variant) listing `id` as a child.
    pub fn parent_groups_of(&self, id: &str) -> Vec<ObjectId> {
        [SectionKind::Group, SectionKind::VariantGroup]
            .into_iter()
            .flat_map(|kind| self.records(kind))
            .filter(|record| {
                record
                    .fields
                    .get_array("children")
                    .is_some_and(|children| children.iter().any(|child| child.as_str() == Some(id)))
            })
            .map(|record| record.id.clone())
            .collect()
    }

    /// Child ids of a group or variant group, in order.
    pub fn group_children(&self, group: &str) -> Vec<ObjectId> {
        self.record(SectionKind::Group, group)
            .or_else(|| self.record(SectionKind::VariantGroup, group))
            .and_then(|record| record.fields.get_array("children"))
            .map(|children| {
                children
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ObjectId::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn group_record_mut(&mut self, group: &str) -> Option<&mut Record> {
        if self.record(SectionKind::Group, group).is_some() {
            self.record_mut(SectionKind::Group, group)
        } else {
            self.record_mut(SectionKind::VariantGroup, group)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GroupCriteria;
    use crate::model::document::{Document, SectionKind};
    use crate::model::value::ObjectRef;

    #[test]
    fn child_edits_match_id_and_comment() {
        let mut document = Document::default();
        let group = document.create_group_record(SectionKind::Group, "Views", Some("Views"));
        let child = ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA1", "View.m");

        assert!(document.add_group_child(group.as_str(), child.clone()));
        assert!(!document.remove_group_child(
            group.as_str(),
            &ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA1", "Other.m")
        ));
        assert_eq!(document.group_children(group.as_str()).len(), 1);
        assert!(document.remove_group_child(group.as_str(), &child));
        assert!(document.group_children(group.as_str()).is_empty());
    }

    #[test]
    fn criteria_require_both_fields_when_given() {
        let mut document = Document::default();
        let id = document.create_group_record(SectionKind::Group, "Views", Some("\"Views\""));

        let both = GroupCriteria {
            name: Some("Views"),
            path: Some("Views"),
        };
        assert_eq!(document.find_group_key(SectionKind::Group, &both), Some(id.clone()));
        let wrong_path = GroupCriteria {
            name: Some("Views"),
            path: Some("Other"),
        };
        assert_eq!(document.find_group_key(SectionKind::Group, &wrong_path), None);
        assert_eq!(
            document.find_group_key(SectionKind::Group, &GroupCriteria::path("Views")),
            Some(id)
        );
        assert_eq!(
            document.find_group_key(SectionKind::Group, &GroupCriteria::default()),
            None
        );
    }

    #[test]
    fn missing_group_reports_false() {
        let mut document = Document::default();
        let child = ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA1", "x");
        assert!(!document.add_group_child("AAAAAAAAAAAAAAAAAAAAAAA9", child));
    }
}
