use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{NoteId, OwnerId, Version};

/// The current human owner of a death note.
///
/// At most one owner record exists at a time. `death_note_id` links back to
/// the owned note and must agree with that note's `owner_id`; the
/// ownership-rejection protocol checks the pair before clearing both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
    pub has_shinigami_eyes: bool,
    pub shinigami_eyes_deal_date: Option<DateTime<Utc>>,
    pub death_note_id: Option<NoteId>,
    pub version: Version,
}

impl Owner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            has_shinigami_eyes: false,
            shinigami_eyes_deal_date: None,
            death_note_id: None,
            version: 0,
        }
    }

    /// Records the eye deal: half the remaining lifespan for the eyes.
    pub fn take_eye_deal(&mut self, deal_date: DateTime<Utc>) {
        self.has_shinigami_eyes = true;
        self.shinigami_eyes_deal_date = Some(deal_date);
    }
}
