use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{NoteId, ShinigamiId, Version};

/// The supernatural issuer of a death note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shinigami {
    pub id: ShinigamiId,
    pub name: String,
    pub death_note_id: Option<NoteId>,
    pub version: Version,
}

impl Shinigami {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            death_note_id: None,
            version: 0,
        }
    }
}
