use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::{NoteId, OwnerId, PersonId, Result, ShinigamiId};
use crate::model::{DeathNote, Owner, Person, Shinigami};

/// Keyed Person storage.
///
/// The registry is agnostic to the underlying engine: the bundled in-memory
/// store serves tests and single-process deployments, and a real database
/// can be wrapped behind the same trait for production use. Every `update`
/// is a conditional write: it succeeds only when the caller's record
/// carries the currently stored version, and bumps the version on success.
/// Losers of a concurrent write receive `NoteError::VersionConflict` and are
/// expected to retry from a fresh read.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Stores a new record, assigning its id and initial version.
    async fn insert(&self, person: Person) -> Result<Person>;

    async fn get(&self, id: PersonId) -> Result<Option<Person>>;

    async fn find_all(&self) -> Result<Vec<Person>>;

    /// Predicate scan: living, non-terminal people whose deadline has
    /// elapsed at `now`. This is the query the scheduler sweeps with.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Person>>;

    /// Conditional write; see the trait docs.
    async fn update(&self, person: &Person) -> Result<Person>;

    /// Returns true when a record was removed.
    async fn delete(&self, id: PersonId) -> Result<bool>;
}

/// Keyed DeathNote storage.
#[async_trait]
pub trait DeathNoteStore: Send + Sync {
    async fn insert(&self, note: DeathNote) -> Result<DeathNote>;

    async fn get(&self, id: NoteId) -> Result<Option<DeathNote>>;

    async fn find_all(&self) -> Result<Vec<DeathNote>>;

    /// Number of notes currently carrying a non-null owner.
    async fn count_owned(&self) -> Result<usize>;

    /// Conditional write; same versioning contract as `PersonStore::update`.
    async fn update(&self, note: &DeathNote) -> Result<DeathNote>;

    async fn delete(&self, id: NoteId) -> Result<bool>;
}

/// Keyed Owner storage. The registry keeps at most one owner record.
#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn insert(&self, owner: Owner) -> Result<Owner>;

    /// The current owner record, if any exists.
    async fn find_current(&self) -> Result<Option<Owner>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Owner>>;

    /// Conditional write; same versioning contract as `PersonStore::update`.
    async fn update(&self, owner: &Owner) -> Result<Owner>;

    async fn delete(&self, id: OwnerId) -> Result<bool>;
}

/// Keyed Shinigami storage.
#[async_trait]
pub trait ShinigamiStore: Send + Sync {
    async fn insert(&self, shinigami: Shinigami) -> Result<Shinigami>;

    async fn get(&self, id: ShinigamiId) -> Result<Option<Shinigami>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Shinigami>>;

    async fn find_all(&self) -> Result<Vec<Shinigami>>;

    async fn delete(&self, id: ShinigamiId) -> Result<bool>;
}
