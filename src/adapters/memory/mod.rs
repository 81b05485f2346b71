//! In-process adapters.
//!
//! Nothing here survives a restart; production deployments use the SQLite
//! store. Useful for tests, previews and single-run CLI sessions.

pub mod sink;
pub mod state_store;

pub use sink::MemorySink;
pub use state_store::InMemoryStateStore;
