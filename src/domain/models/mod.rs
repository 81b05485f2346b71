//! Domain models for polling triggers.

pub mod candidate;
pub mod config;
pub mod dedup_state;
pub mod outcome;
pub mod trigger;

pub use candidate::Candidate;
pub use config::{
    Config, DatabaseConfig, LogFormat, LoggingConfig, PollingConfig, RotationPolicy,
};
pub use dedup_state::{DedupState, DedupStrategy, LastItemState, TimebasedState};
pub use outcome::{PollOutcome, PollStats, StopReason};
pub use trigger::{AuthCredentials, InstanceKey, PagePolicy, TriggerContext, TriggerStatus};
