use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::core::{NoteError, NoteId, OwnerId, PersonId, Result, ShinigamiId};
use crate::model::{DeathNote, Owner, Person, Shinigami};
use crate::scheduler::{DeathScheduler, SweepReport};
use crate::storage::{
    DeathNoteStore, InMemoryDeathNoteStore, InMemoryOwnerStore, InMemoryPersonStore,
    InMemoryShinigamiStore, OwnerStore, PersonStore, ShinigamiStore,
};

/// The death note registry: writing names, specifying deaths, and managing
/// note ownership, over any store implementation.
///
/// Every mutation follows the same optimistic discipline the scheduler
/// uses: read the record fresh, apply the transition, write conditionally
/// on the version observed, and retry from a new read when a concurrent
/// writer got there first.
///
/// # Examples
///
/// ```
/// use deathnote::DeathNoteRegistry;
/// use uuid::Uuid;
///
/// # tokio_test::block_on(async {
/// let registry = DeathNoteRegistry::in_memory();
///
/// let note = registry.initialize_note(Uuid::new_v4(), None).await.unwrap();
/// let person = registry.write_name("Kurou Otoharada", None, note.id).await.unwrap();
/// registry.write_person_in_note(note.id, person.id).await.unwrap();
///
/// assert!(person.alive);
/// # });
/// ```
pub struct DeathNoteRegistry {
    people: Arc<dyn PersonStore>,
    notes: Arc<dyn DeathNoteStore>,
    owners: Arc<dyn OwnerStore>,
    shinigami: Arc<dyn ShinigamiStore>,
    config: RegistryConfig,
}

impl DeathNoteRegistry {
    /// Registry over fresh in-memory stores with default configuration.
    pub fn in_memory() -> Self {
        Self {
            people: Arc::new(InMemoryPersonStore::new()),
            notes: Arc::new(InMemoryDeathNoteStore::new()),
            owners: Arc::new(InMemoryOwnerStore::new()),
            shinigami: Arc::new(InMemoryShinigamiStore::new()),
            config: RegistryConfig::default(),
        }
    }

    /// Registry over fresh in-memory stores with custom configuration.
    pub fn in_memory_with_config(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::in_memory()
        })
    }

    /// Registry over caller-provided stores, e.g. a real database behind
    /// the store traits.
    pub fn with_stores(
        people: Arc<dyn PersonStore>,
        notes: Arc<dyn DeathNoteStore>,
        owners: Arc<dyn OwnerStore>,
        shinigami: Arc<dyn ShinigamiStore>,
        config: RegistryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            people,
            notes,
            owners,
            shinigami,
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ========================================================================
    // Person lifecycle
    // ========================================================================

    /// Writes a name into the registry. The person enters the pending state,
    /// scheduled to die of the default heart attack 40 seconds after entry.
    pub async fn write_name(
        &self,
        name: &str,
        face_photo: Option<String>,
        note_id: NoteId,
    ) -> Result<Person> {
        let person = Person::written(name, face_photo, note_id, Utc::now(), &self.config)?;
        let stored = self.people.insert(person).await?;
        info!(
            "wrote '{}' ({}) into note {}; death scheduled for {:?}",
            stored.name, stored.id, note_id, stored.scheduled_death_time
        );
        Ok(stored)
    }

    /// Opens the detail-specification window for a pending person,
    /// extending the deadline to 400 seconds from entry. Idempotent: a
    /// person already awaiting details, explicitly scheduled, or dead is
    /// returned unchanged.
    pub async fn begin_detail_specification(&self, person_id: PersonId) -> Result<Person> {
        for _ in 0..self.config.write_retry_limit {
            let mut person = self.load_person(person_id).await?;
            if !person.begin_detail_specification(&self.config) {
                return Ok(person);
            }

            match self.people.update(&person).await {
                Ok(updated) => {
                    debug!(
                        "'{}' awaiting details, deadline extended to {:?}",
                        updated.name, updated.scheduled_death_time
                    );
                    return Ok(updated);
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(retries_exhausted("begin detail specification", person_id))
    }

    /// Applies explicit death details to a living person. A target time at
    /// or before now (within tolerance) kills immediately; a future target
    /// reschedules. A missing target is a validation error.
    pub async fn specify_death(
        &self,
        person_id: PersonId,
        target: Option<DateTime<Utc>>,
        details: &str,
        cause: &str,
    ) -> Result<Person> {
        let target = target.ok_or_else(|| {
            NoteError::Validation("an explicit death time is required".to_string())
        })?;

        for _ in 0..self.config.write_retry_limit {
            let mut person = self.load_person(person_id).await?;
            person.specify_death(target, details, cause, Utc::now(), &self.config)?;

            match self.people.update(&person).await {
                Ok(updated) => {
                    info!(
                        "death of '{}' specified: {} at {}",
                        updated.name, cause, target
                    );
                    return Ok(updated);
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(retries_exhausted("specify death", person_id))
    }

    pub async fn find_person(&self, person_id: PersonId) -> Result<Option<Person>> {
        self.people.get(person_id).await
    }

    pub async fn find_all_people(&self) -> Result<Vec<Person>> {
        self.people.find_all().await
    }

    /// Deletes a person and pulls their id out of the owning note's page.
    /// The note-side cleanup retries until it sticks; the person record is
    /// already gone by then.
    pub async fn delete_person(&self, person_id: PersonId) -> Result<()> {
        let person = self.load_person(person_id).await?;
        if !self.people.delete(person_id).await? {
            return Err(NoteError::PersonNotFound(person_id));
        }

        for _ in 0..self.config.write_retry_limit {
            let Some(mut note) = self.notes.get(person.death_note_id).await? else {
                return Ok(());
            };
            if !note.remove_person_id(person_id) {
                return Ok(());
            }

            match self.notes.update(&note).await {
                Ok(_) => {
                    info!("erased '{}' ({}) from note {}", person.name, person_id, note.id);
                    return Ok(());
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(retries_exhausted("erase person from note", person_id))
    }

    // ========================================================================
    // Death note ownership
    // ========================================================================

    /// Registers a person against a note. The owner writing their own name
    /// is a conflict; writing the same person twice is a no-op (the page
    /// keeps set semantics). The person record itself is never mutated here.
    pub async fn write_person_in_note(&self, note_id: NoteId, person_id: PersonId) -> Result<DeathNote> {
        for _ in 0..self.config.write_retry_limit {
            let mut note = self.load_note(note_id).await?;
            let person = self.load_person(person_id).await?;

            if note.owner_id == Some(person_id) {
                return Err(NoteError::Conflict(
                    "the owner cannot write their own name".to_string(),
                ));
            }

            if !note.add_person_id(person.id) {
                return Ok(note);
            }

            match self.notes.update(&note).await {
                Ok(updated) => {
                    debug!("note {} now lists '{}' ({})", note_id, person.name, person_id);
                    return Ok(updated);
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(retries_exhausted("write person in note", person_id))
    }

    /// Creates a death note for an issuing shinigami, optionally claimed by
    /// an initial owner. Under the single-initial-owner policy, claiming
    /// fails while any other note is already owned.
    pub async fn initialize_note(
        &self,
        shinigami_id: ShinigamiId,
        owner_id: Option<OwnerId>,
    ) -> Result<DeathNote> {
        if owner_id.is_some() && self.config.single_initial_owner {
            let owned = self.notes.count_owned().await?;
            if owned > 0 {
                return Err(NoteError::Conflict(
                    "a death note with an owner already exists".to_string(),
                ));
            }
        }

        let note = self.notes.insert(DeathNote::new(shinigami_id, owner_id)).await?;
        info!(
            "initialized note {} from shinigami {} (owner: {:?})",
            note.id, shinigami_id, owner_id
        );
        Ok(note)
    }

    pub async fn find_note(&self, note_id: NoteId) -> Result<Option<DeathNote>> {
        self.notes.get(note_id).await
    }

    pub async fn find_all_notes(&self) -> Result<Vec<DeathNote>> {
        self.notes.find_all().await
    }

    /// Removes a note record. People written in it are left untouched;
    /// their records keep the note id for historical reads.
    pub async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        if !self.notes.delete(note_id).await? {
            return Err(NoteError::NoteNotFound(note_id));
        }
        info!("note {} destroyed", note_id);
        Ok(())
    }

    /// Renounces ownership of a note: clears the owner's link and the
    /// note's owner id. Fails with a conflict when the stored owner record
    /// does not actually link back to this note.
    ///
    /// The owner side is written first; if this call dies between the two
    /// writes, re-running it converges instead of double-applying.
    pub async fn reject_ownership(&self, note_id: NoteId) -> Result<DeathNote> {
        let note = self.load_note(note_id).await?;
        let mut owner = self
            .owners
            .find_current()
            .await?
            .ok_or(NoteError::OwnerNotFound)?;

        let owner_links_back = owner.death_note_id == Some(note_id);
        let note_names_owner = note.owner_id == Some(owner.id);
        if !owner_links_back && !note_names_owner {
            return Err(NoteError::Conflict(
                "owner record does not match this death note".to_string(),
            ));
        }

        if owner_links_back {
            owner.death_note_id = None;
            self.owners.update(&owner).await?;
        }

        for _ in 0..self.config.write_retry_limit {
            let mut note = self.load_note(note_id).await?;
            if note.owner_id.is_none() {
                return Ok(note);
            }
            if note.owner_id != Some(owner.id) {
                return Err(NoteError::Conflict(
                    "owner record does not match this death note".to_string(),
                ));
            }

            note.owner_id = None;
            match self.notes.update(&note).await {
                Ok(updated) => {
                    info!("ownership of note {} rejected by '{}'", note_id, owner.name);
                    return Ok(updated);
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(retries_exhausted("reject ownership", note_id))
    }

    // ========================================================================
    // Owner and shinigami records
    // ========================================================================

    /// Upserts the single owner record: when one already exists its fields
    /// are replaced in place rather than a second record being created.
    pub async fn save_owner(&self, owner: Owner) -> Result<Owner> {
        match self.owners.find_current().await? {
            Some(mut existing) => {
                existing.name = owner.name;
                existing.has_shinigami_eyes = owner.has_shinigami_eyes;
                existing.shinigami_eyes_deal_date = owner.shinigami_eyes_deal_date;
                existing.death_note_id = owner.death_note_id;
                self.owners.update(&existing).await
            }
            None => self.owners.insert(owner).await,
        }
    }

    /// The current owner record, or `OwnerNotFound` when nobody holds a note.
    pub async fn find_owner(&self) -> Result<Owner> {
        self.owners
            .find_current()
            .await?
            .ok_or(NoteError::OwnerNotFound)
    }

    pub async fn find_owner_by_name(&self, name: &str) -> Result<Option<Owner>> {
        self.owners.find_by_name(name).await
    }

    /// Removes the current owner record entirely, e.g. after the owner
    /// forfeits the note and their memory of it.
    pub async fn delete_owner(&self) -> Result<()> {
        let owner = self.find_owner().await?;
        self.owners.delete(owner.id).await?;
        Ok(())
    }

    pub async fn create_shinigami(&self, name: &str) -> Result<Shinigami> {
        if name.trim().is_empty() {
            return Err(NoteError::Validation("name cannot be empty".to_string()));
        }
        self.shinigami.insert(Shinigami::new(name)).await
    }

    pub async fn find_shinigami(&self, shinigami_id: ShinigamiId) -> Result<Shinigami> {
        self.shinigami
            .get(shinigami_id)
            .await?
            .ok_or(NoteError::ShinigamiNotFound(shinigami_id))
    }

    pub async fn find_shinigami_by_name(&self, name: &str) -> Result<Option<Shinigami>> {
        self.shinigami.find_by_name(name).await
    }

    pub async fn find_all_shinigami(&self) -> Result<Vec<Shinigami>> {
        self.shinigami.find_all().await
    }

    pub async fn delete_shinigami(&self, shinigami_id: ShinigamiId) -> Result<()> {
        if !self.shinigami.delete(shinigami_id).await? {
            return Err(NoteError::ShinigamiNotFound(shinigami_id));
        }
        Ok(())
    }

    // ========================================================================
    // Scheduler
    // ========================================================================

    /// A scheduler sharing this registry's person store and configuration.
    pub fn scheduler(&self) -> DeathScheduler {
        DeathScheduler::new(Arc::clone(&self.people), self.config.clone())
    }

    /// Runs one sweep at `now`. Exposed directly so tests and callers can
    /// drive reconciliation without waiting on a wall clock.
    pub async fn run_scheduler_tick(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        self.scheduler().run_tick(now).await
    }

    async fn load_person(&self, person_id: PersonId) -> Result<Person> {
        self.people
            .get(person_id)
            .await?
            .ok_or(NoteError::PersonNotFound(person_id))
    }

    async fn load_note(&self, note_id: NoteId) -> Result<DeathNote> {
        self.notes
            .get(note_id)
            .await?
            .ok_or(NoteError::NoteNotFound(note_id))
    }
}

fn retries_exhausted(operation: &str, id: Uuid) -> NoteError {
    NoteError::Conflict(format!(
        "could not {operation} for '{id}': the record kept changing under concurrent writes"
    ))
}
