//! pollgate - polling trigger engine
//!
//! Turns a remote system that can only be polled into a stream of "new item"
//! events. Each trigger instance keeps a small piece of dedup state between
//! ticks: a high-water-mark for time-based sources, or the key snapshot of
//! the last fetch for sources without reliable timestamps.
//!
//! # Architecture
//!
//! Hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the ports integrations implement
//! - **Service Layer** (`services`): dedup engine, page controller, trigger lifecycle
//! - **Adapters** (`adapters`): state stores and item sources
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pollgate::adapters::memory::InMemoryStateStore;
//! use pollgate::adapters::plugins::{HttpJsonSource, HttpSourceConfig};
//! use pollgate::{DedupStrategy, TriggerContext, TriggerLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = HttpJsonSource::new("pins", HttpSourceConfig::new("https://api.example.com/pins"))?;
//!     let trigger = TriggerLifecycle::new(
//!         DedupStrategy::Timebased,
//!         Arc::new(source),
//!         Arc::new(InMemoryStateStore::new()),
//!     );
//!     let ctx = TriggerContext::new("flow-1/new-pin");
//!     trigger.on_enable(&ctx).await?;
//!     let new_items = trigger.poll(&ctx).await?;
//!     println!("{new_items:?}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DedupError, DeliveryError, SourceError, StoreError, TriggerError, TriggerResult};
pub use domain::models::{
    AuthCredentials, Candidate, Config, DedupState, DedupStrategy, InstanceKey, PagePolicy,
    PollOutcome, PollStats, StopReason, TriggerContext, TriggerStatus,
};
pub use domain::ports::{Clock, EmitSink, ItemSource, PageCursor, SourcePage, StateStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DedupOutcome, PageController, TriggerLifecycle};
