//! Port trait definitions (Hexagonal Architecture)
//!
//! The engine talks to the outside world only through these traits:
//! - ItemSource: integration-specific page fetching
//! - StateStore: per-instance dedup state persistence
//! - EmitSink: hand-off of new items to the consumer
//! - Clock: the current time

pub mod clock;
pub mod emit_sink;
pub mod item_source;
pub mod state_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use emit_sink::EmitSink;
pub use item_source::{ItemSource, PageCursor, SourcePage};
pub use state_store::StateStore;
