//! Infrastructure adapters for external systems.

pub mod memory;
pub mod plugins;
pub mod sqlite;
