pub mod assets;
pub mod duckdb_storage;
pub mod hooks;
pub mod memory_storage;
pub mod migration;
pub mod plugins;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use assets::*;
pub use duckdb_storage::*;
pub use hooks::*;
pub use memory_storage::*;
pub use migration::{CURRENT_VERSION, MigrationError, Migrator, PersistedState, SchemaVersion};
pub use plugins::*;
pub use storage::*;
