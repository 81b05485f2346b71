//! Domain layer for the polling trigger engine.
//!
//! Holds the dedup state model, trigger identity and context types, and the
//! port traits that item sources, state stores and emit sinks implement.

pub mod errors;
pub mod models;
pub mod ports;
