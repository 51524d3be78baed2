pub mod registry;

pub use registry::DeathNoteRegistry;
