pub mod death_note;
pub mod owner;
pub mod person;
pub mod shinigami;

pub use death_note::DeathNote;
pub use owner::Owner;
pub use person::{Person, PersonStatus};
pub use shinigami::Shinigami;
