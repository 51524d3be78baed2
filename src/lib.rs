// ============================================================================
// Death Note Registry Library
// ============================================================================

//! A death note registry: an authorized owner writes a person's name into a
//! note, and the person dies of the default heart attack 40 seconds later
//! unless explicit death details extend or redirect the deadline.
//!
//! The crate is built around three pieces:
//!
//! - the person lifecycle state machine ([`Person`], [`PersonStatus`]),
//! - the ownership protocol on [`DeathNoteRegistry`] (writing names into
//!   notes, initializing and rejecting ownership),
//! - the reconciliation [`DeathScheduler`], which periodically sweeps the
//!   store and finalizes everyone whose deadline has elapsed.
//!
//! All coordination happens through versioned, conditional writes against
//! the record store, so request-driven operations and the background sweep
//! can race on the same person without losing updates.
//!
//! # Examples
//!
//! ```
//! use chrono::{Duration, Utc};
//! use deathnote::{DeathNoteRegistry, PersonStatus};
//! use uuid::Uuid;
//!
//! # tokio_test::block_on(async {
//! let registry = DeathNoteRegistry::in_memory();
//!
//! let note = registry.initialize_note(Uuid::new_v4(), None).await.unwrap();
//! let person = registry.write_name("Lind L. Tailor", None, note.id).await.unwrap();
//! registry.write_person_in_note(note.id, person.id).await.unwrap();
//!
//! // 41 seconds later the sweep finds the lapsed deadline.
//! let report = registry
//!     .run_scheduler_tick(Utc::now() + Duration::seconds(41))
//!     .await
//!     .unwrap();
//! assert_eq!(report.finalized, 1);
//!
//! let person = registry.find_person(person.id).await.unwrap().unwrap();
//! assert!(!person.alive);
//! assert_eq!(person.status, PersonStatus::DeadTimeout);
//! # });
//! ```

pub mod config;
pub mod core;
pub mod facade;
pub mod model;
pub mod scheduler;
pub mod storage;

// Re-export main types for convenience
pub use config::RegistryConfig;
pub use core::{NoteError, Result};
pub use facade::DeathNoteRegistry;
pub use model::{DeathNote, Owner, Person, PersonStatus, Shinigami};
pub use scheduler::{DeathScheduler, SchedulerWorker, SweepReport};
pub use storage::{
    DeathNoteStore, InMemoryDeathNoteStore, InMemoryOwnerStore, InMemoryPersonStore,
    InMemoryShinigamiStore, OwnerStore, PersonStore, ShinigamiStore,
};
