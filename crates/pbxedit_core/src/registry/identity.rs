//! Object identity allocation.
//!
//! # Invariants
//! - Allocated ids are 24 upper-case hex characters.
//! - An id is never handed out twice by one document, even before insertion.
//! - An id never collides with a record already present in any section.

use crate::model::document::Document;
use crate::model::value::{is_well_formed_id, ObjectId, OBJECT_ID_LEN};
use log::trace;
use uuid::Uuid;

impl Document {
    /// Allocates a fresh id unique within this document.
    pub fn allocate_id(&mut self) -> ObjectId {
        self.allocate_id_from(random_candidate)
    }

    /// Draws candidates from `next` until one is neither recorded nor
    /// already handed out.
    fn allocate_id_from(&mut self, mut next: impl FnMut() -> ObjectId) -> ObjectId {
        loop {
            let candidate = next();
            if self.contains_id(candidate.as_str()) || self.allocated.contains(&candidate) {
                trace!("event=id_collision module=registry status=retry id={candidate}");
                continue;
            }
            self.allocated.insert(candidate.clone());
            return candidate;
        }
    }

    /// Every well-formed record id across all sections, in document order.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        self.sections()
            .iter()
            .flat_map(|section| section.ids())
            .filter(|id| is_well_formed_id(id.as_str()))
            .cloned()
            .collect()
    }
}

fn random_candidate() -> ObjectId {
    let mut buffer = Uuid::encode_buffer();
    let encoded = Uuid::new_v4().simple().encode_upper(&mut buffer);
    ObjectId::new(&encoded[..OBJECT_ID_LEN])
}

#[cfg(test)]
mod tests {
    use crate::model::document::{Document, Record, SectionKind};
    use crate::model::value::{Dict, ObjectId};
    use std::collections::HashSet;

    const TAKEN: &str = "AAAAAAAAAAAAAAAAAAAAAAA1";
    const FRESH: &str = "AAAAAAAAAAAAAAAAAAAAAAA2";

    fn with_group(id: &str) -> Document {
        let mut document = Document::default();
        document.insert_record(
            SectionKind::Group,
            Record::new(ObjectId::from(id), "Group", Dict::new().with("isa", "PBXGroup")),
        );
        document
    }

    #[test]
    fn allocations_are_distinct_and_well_formed() {
        let mut document = Document::default();
        let ids: HashSet<ObjectId> = (0..500).map(|_| document.allocate_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(ObjectId::is_well_formed));
    }

    #[test]
    fn all_ids_skips_foreign_keys() {
        let mut document = Document::default();
        let id = document.allocate_id();
        document.insert_record(
            SectionKind::Group,
            Record::new(id.clone(), "Group", Dict::new().with("isa", "PBXGroup")),
        );
        document.insert_record(
            SectionKind::Group,
            Record::new(ObjectId::from("short"), "Other", Dict::new().with("isa", "PBXGroup")),
        );
        assert_eq!(document.all_ids(), vec![id]);
    }

    #[test]
    fn allocation_retries_past_recorded_ids() {
        let mut document = with_group(TAKEN);
        let mut candidates = vec![FRESH, TAKEN].into_iter().map(ObjectId::from);

        let id = document.allocate_id_from(move || candidates.next_back().unwrap());

        assert_eq!(id.as_str(), FRESH);
        assert!(id.is_well_formed());
    }

    #[test]
    fn allocation_skips_ids_handed_out_before_insertion() {
        let mut document = Document::default();
        let first = document.allocate_id_from(|| ObjectId::from(TAKEN));
        let mut candidates = vec![FRESH, TAKEN].into_iter().map(ObjectId::from);

        let second = document.allocate_id_from(move || candidates.next_back().unwrap());

        assert_eq!(first.as_str(), TAKEN);
        assert_eq!(second.as_str(), FRESH);
    }

    #[test]
    fn random_allocation_avoids_populated_sections() {
        let mut document = with_group(TAKEN);
        let existing: HashSet<ObjectId> = document.all_ids().into_iter().collect();

        for _ in 0..200 {
            let id = document.allocate_id();
            assert!(!existing.contains(&id));
            assert!(id.is_well_formed());
        }
    }
}
