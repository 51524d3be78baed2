use uuid::Uuid;

/// Record identifiers are opaque and assigned by the store on insert.
pub type PersonId = Uuid;
pub type NoteId = Uuid;
pub type OwnerId = Uuid;
pub type ShinigamiId = Uuid;

/// Per-record write counter checked on every conditional update.
pub type Version = u64;
