use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Person '{0}' not found")]
    PersonNotFound(Uuid),

    #[error("Death note '{0}' not found")]
    NoteNotFound(Uuid),

    #[error("No owner record exists")]
    OwnerNotFound,

    #[error("Shinigami '{0}' not found")]
    ShinigamiNotFound(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Stale write to {kind} '{id}': record was modified concurrently")]
    VersionConflict { kind: &'static str, id: Uuid },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoteError {
    /// True for optimistic-concurrency losses that callers may retry from a fresh read.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, NoteError::VersionConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
