use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{NoteId, OwnerId, PersonId, ShinigamiId, Version};

/// A death note: issued by a shinigami, optionally owned by a human, holding
/// the ids of every person written into it.
///
/// `person_ids` is append-only with set semantics: an id never appears
/// twice no matter how many times registration is attempted. The issuer is
/// immutable once set; ownership may change or be rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathNote {
    pub id: NoteId,
    pub shinigami_id: ShinigamiId,
    pub owner_id: Option<OwnerId>,
    pub person_ids: Vec<PersonId>,
    pub version: Version,
}

impl DeathNote {
    pub fn new(shinigami_id: ShinigamiId, owner_id: Option<OwnerId>) -> Self {
        Self {
            id: Uuid::nil(),
            shinigami_id,
            owner_id,
            person_ids: Vec::new(),
            version: 0,
        }
    }

    /// Appends a person id unless it is already present.
    /// Returns true when the id was newly added.
    pub fn add_person_id(&mut self, person_id: PersonId) -> bool {
        if self.person_ids.contains(&person_id) {
            return false;
        }
        self.person_ids.push(person_id);
        true
    }

    /// Removes a person id; returns true when it was present.
    pub fn remove_person_id(&mut self, person_id: PersonId) -> bool {
        let before = self.person_ids.len();
        self.person_ids.retain(|id| *id != person_id);
        self.person_ids.len() != before
    }

    pub fn contains_person(&self, person_id: PersonId) -> bool {
        self.person_ids.contains(&person_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_person_id_has_set_semantics() {
        let mut note = DeathNote::new(Uuid::new_v4(), None);
        let person_id = Uuid::new_v4();

        assert!(note.add_person_id(person_id));
        assert!(!note.add_person_id(person_id));
        assert_eq!(note.person_ids.len(), 1);
        assert!(note.contains_person(person_id));
    }

    #[test]
    fn test_remove_person_id() {
        let mut note = DeathNote::new(Uuid::new_v4(), None);
        let person_id = Uuid::new_v4();
        note.add_person_id(person_id);

        assert!(note.remove_person_id(person_id));
        assert!(!note.remove_person_id(person_id));
        assert!(note.person_ids.is_empty());
    }
}
