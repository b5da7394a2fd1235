//! Build-phase lookups and `files` list edits.

use crate::model::document::{Document, SectionKind};
use crate::model::value::{ObjectId, ObjectRef, Value};

impl Document {
    /// Finds the phase of `kind` whose comment is `comment`.
    ///
    /// With a target, that target's `buildPhases` are searched first; the
    /// section-wide first match is the fallback either way.
    pub fn build_phase_id(
        &self,
        kind: SectionKind,
        comment: &str,
        target: Option<&str>,
    ) -> Option<ObjectId> {
        if let Some(phases) = target
            .and_then(|target| self.native_target(target))
            .and_then(|record| record.fields.get_array("buildPhases"))
        {
            let owned = phases
                .iter()
                .filter(|phase| phase.comment() == Some(comment))
                .filter_map(Value::as_str)
                .find(|id| self.record(kind, id).is_some());
            if let Some(id) = owned {
                return Some(ObjectId::from(id));
            }
        }
        self.item_by_comment(kind, comment)
            .map(|record| record.id.clone())
    }

    /// Section kind of the phase record `id`, if it is a phase.
    pub fn phase_kind_of(&self, id: &str) -> Option<SectionKind> {
        SectionKind::PHASES
            .into_iter()
            .find(|kind| self.record(*kind, id).is_some())
    }

    /// Appends `entry` to a phase's `files`. Returns `false` for an unknown phase.
    pub fn push_phase_entry(&mut self, phase: &str, entry: ObjectRef) -> bool {
        let Some(kind) = self.phase_kind_of(phase) else {
            return false;
        };
        let Some(record) = self.record_mut(kind, phase) else {
            return false;
        };
        record.fields.entry_array("files").push(Value::Ref(entry));
        true
    }

    /// Removes the first `files` entry with `comment` from a phase.
    pub fn remove_phase_entry_by_comment(&mut self, phase: &str, comment: &str) -> bool {
        let Some(kind) = self.phase_kind_of(phase) else {
            return false;
        };
        let Some(files) = self
            .record_mut(kind, phase)
            .and_then(|record| record.fields.get_array_mut("files"))
        else {
            return false;
        };
        match files.iter().position(|entry| entry.comment() == Some(comment)) {
            Some(index) => {
                files.remove(index);
                true
            }
            None => false,
        }
    }

    /// Strips the build file `id` from every phase of every kind.
    pub fn remove_build_file_from_phases(&mut self, id: &str) {
        for kind in SectionKind::PHASES {
            let Some(section) = self.section_mut(kind) else {
                continue;
            };
            for record in section.records_mut() {
                if let Some(files) = record.fields.get_array_mut("files") {
                    files.retain(|entry| entry.as_str() != Some(id));
                }
            }
        }
    }

    /// Build file in `phase` whose `fileRef` is `file_ref`.
    pub fn phase_build_file_for(&self, phase: &str, file_ref: &str) -> Option<ObjectId> {
        let kind = self.phase_kind_of(phase)?;
        self.record(kind, phase)?
            .fields
            .get_array("files")?
            .iter()
            .filter_map(Value::as_str)
            .find(|id| {
                self.record(SectionKind::BuildFile, id)
                    .is_some_and(|build_file| build_file.get_str("fileRef") == Some(file_ref))
            })
            .map(ObjectId::from)
    }

    /// Ids listed in a phase's `files`.
    pub fn phase_files(&self, phase: &str) -> Vec<ObjectId> {
        self.phase_kind_of(phase)
            .and_then(|kind| self.record(kind, phase))
            .and_then(|record| record.fields.get_array("files"))
            .map(|files| files.iter().filter_map(Value::as_str).map(ObjectId::from).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::document::{Document, Record, SectionKind};
    use crate::model::value::{Dict, ObjectId, ObjectRef, Value};

    fn document_with_phase() -> (Document, ObjectId) {
        let mut document = Document::default();
        let phase = document.allocate_id();
        document.insert_record(
            SectionKind::SourcesBuildPhase,
            Record::new(
                phase.clone(),
                "Sources",
                Dict::new()
                    .with("isa", "PBXSourcesBuildPhase")
                    .with("files", Vec::<Value>::new()),
            ),
        );
        (document, phase)
    }

    #[test]
    fn entries_are_pushed_and_removed_by_comment() {
        let (mut document, phase) = document_with_phase();
        let entry = ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA1", "a.m in Sources");
        assert!(document.push_phase_entry(phase.as_str(), entry));
        assert_eq!(document.phase_files(phase.as_str()).len(), 1);
        assert!(!document.remove_phase_entry_by_comment(phase.as_str(), "b.m in Sources"));
        assert!(document.remove_phase_entry_by_comment(phase.as_str(), "a.m in Sources"));
        assert!(document.phase_files(phase.as_str()).is_empty());
    }

    #[test]
    fn lookup_falls_back_to_section_match() {
        let (document, phase) = document_with_phase();
        assert_eq!(
            document.build_phase_id(SectionKind::SourcesBuildPhase, "Sources", None),
            Some(phase.clone())
        );
        assert_eq!(
            document.build_phase_id(
                SectionKind::SourcesBuildPhase,
                "Sources",
                Some("AAAAAAAAAAAAAAAAAAAAAAA9")
            ),
            Some(phase)
        );
        assert_eq!(
            document.build_phase_id(SectionKind::ResourcesBuildPhase, "Sources", None),
            None
        );
    }
}
