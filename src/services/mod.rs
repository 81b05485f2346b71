//! Core engine: deduplication, pagination and lifecycle orchestration.

pub mod dedup_engine;
pub mod page_controller;
pub mod trigger_lifecycle;

pub use dedup_engine::{dedupe, DedupOutcome};
pub use page_controller::{PageController, PageRun};
pub use trigger_lifecycle::TriggerLifecycle;
