pub mod memory;
pub mod store;

pub use memory::{
    InMemoryDeathNoteStore, InMemoryOwnerStore, InMemoryPersonStore, InMemoryShinigamiStore,
};
pub use store::{DeathNoteStore, OwnerStore, PersonStore, ShinigamiStore};
