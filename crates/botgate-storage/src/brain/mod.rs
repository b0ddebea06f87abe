//! `Brain` implementations

mod memory;
mod sqlite;

pub use memory::MemoryBrain;
pub use sqlite::SqliteBrain;
