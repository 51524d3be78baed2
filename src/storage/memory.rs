use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{NoteError, Result};
use crate::model::{DeathNote, Owner, Person, Shinigami};
use crate::storage::store::{DeathNoteStore, OwnerStore, PersonStore, ShinigamiStore};

/// Anything the versioned map can hold: identifiable, versioned, cloneable.
trait Record: Clone + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

macro_rules! impl_record {
    ($type:ty, $kind:literal) => {
        impl Record for $type {
            const KIND: &'static str = $kind;

            fn id(&self) -> Uuid {
                self.id
            }
            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }
            fn version(&self) -> u64 {
                self.version
            }
            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
}

impl_record!(Person, "person");
impl_record!(DeathNote, "death note");
impl_record!(Owner, "owner");
impl_record!(Shinigami, "shinigami");

/// Keyed records with per-record version counters.
///
/// Updates are conditional: the caller's version must match the stored one,
/// otherwise the write is rejected with `VersionConflict` and the caller
/// re-reads. This is the whole coordination protocol; no locks are held
/// across operations.
struct VersionedMap<T: Record> {
    records: RwLock<HashMap<Uuid, T>>,
}

impl<T: Record> VersionedMap<T> {
    fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    async fn insert(&self, mut record: T) -> T {
        record.set_id(Uuid::new_v4());
        record.set_version(1);
        let mut records = self.records.write().await;
        records.insert(record.id(), record.clone());
        record
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.records.read().await.get(&id).cloned()
    }

    async fn find<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.records
            .read()
            .await
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Ok(None) when no record with this id exists; the caller maps that to
    /// its own not-found error.
    async fn update(&self, record: &T) -> Result<Option<T>> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id()) {
            None => Ok(None),
            Some(stored) if stored.version() != record.version() => {
                Err(NoteError::VersionConflict {
                    kind: T::KIND,
                    id: record.id(),
                })
            }
            Some(stored) => {
                let mut next = record.clone();
                next.set_version(record.version() + 1);
                *stored = next.clone();
                Ok(Some(next))
            }
        }
    }

    async fn delete(&self, id: Uuid) -> bool {
        self.records.write().await.remove(&id).is_some()
    }
}

/// In-memory `PersonStore` with optimistic versioning.
pub struct InMemoryPersonStore {
    records: VersionedMap<Person>,
}

impl InMemoryPersonStore {
    pub fn new() -> Self {
        Self {
            records: VersionedMap::new(),
        }
    }
}

impl Default for InMemoryPersonStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonStore for InMemoryPersonStore {
    async fn insert(&self, person: Person) -> Result<Person> {
        Ok(self.records.insert(person).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Person>> {
        Ok(self.records.get(id).await)
    }

    async fn find_all(&self) -> Result<Vec<Person>> {
        Ok(self.records.find(|_| true).await)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Person>> {
        Ok(self.records.find(|person| person.is_due(now)).await)
    }

    async fn update(&self, person: &Person) -> Result<Person> {
        self.records
            .update(person)
            .await?
            .ok_or(NoteError::PersonNotFound(person.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.delete(id).await)
    }
}

/// In-memory `DeathNoteStore` with optimistic versioning.
pub struct InMemoryDeathNoteStore {
    records: VersionedMap<DeathNote>,
}

impl InMemoryDeathNoteStore {
    pub fn new() -> Self {
        Self {
            records: VersionedMap::new(),
        }
    }
}

impl Default for InMemoryDeathNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeathNoteStore for InMemoryDeathNoteStore {
    async fn insert(&self, note: DeathNote) -> Result<DeathNote> {
        Ok(self.records.insert(note).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeathNote>> {
        Ok(self.records.get(id).await)
    }

    async fn find_all(&self) -> Result<Vec<DeathNote>> {
        Ok(self.records.find(|_| true).await)
    }

    async fn count_owned(&self) -> Result<usize> {
        Ok(self.records.find(|note| note.owner_id.is_some()).await.len())
    }

    async fn update(&self, note: &DeathNote) -> Result<DeathNote> {
        self.records
            .update(note)
            .await?
            .ok_or(NoteError::NoteNotFound(note.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.delete(id).await)
    }
}

/// In-memory `OwnerStore` with optimistic versioning.
pub struct InMemoryOwnerStore {
    records: VersionedMap<Owner>,
}

impl InMemoryOwnerStore {
    pub fn new() -> Self {
        Self {
            records: VersionedMap::new(),
        }
    }
}

impl Default for InMemoryOwnerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OwnerStore for InMemoryOwnerStore {
    async fn insert(&self, owner: Owner) -> Result<Owner> {
        Ok(self.records.insert(owner).await)
    }

    async fn find_current(&self) -> Result<Option<Owner>> {
        Ok(self.records.find(|_| true).await.into_iter().next())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Owner>> {
        Ok(self
            .records
            .find(|owner| owner.name == name)
            .await
            .into_iter()
            .next())
    }

    async fn update(&self, owner: &Owner) -> Result<Owner> {
        self.records
            .update(owner)
            .await?
            .ok_or(NoteError::OwnerNotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.delete(id).await)
    }
}

/// In-memory `ShinigamiStore`.
pub struct InMemoryShinigamiStore {
    records: VersionedMap<Shinigami>,
}

impl InMemoryShinigamiStore {
    pub fn new() -> Self {
        Self {
            records: VersionedMap::new(),
        }
    }
}

impl Default for InMemoryShinigamiStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShinigamiStore for InMemoryShinigamiStore {
    async fn insert(&self, shinigami: Shinigami) -> Result<Shinigami> {
        Ok(self.records.insert(shinigami).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Shinigami>> {
        Ok(self.records.get(id).await)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Shinigami>> {
        Ok(self
            .records
            .find(|shinigami| shinigami.name == name)
            .await
            .into_iter()
            .next())
    }

    async fn find_all(&self) -> Result<Vec<Shinigami>> {
        Ok(self.records.find(|_| true).await)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.delete(id).await)
    }
}
