//! Domain errors for the polling trigger engine.

use thiserror::Error;

use crate::domain::models::DedupStrategy;

/// Errors an [`ItemSource`](crate::domain::ports::ItemSource) reports for a
/// single page fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure, timeout, rate limiting or an upstream 5xx.
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    #[error("Upstream returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Whether the next scheduled tick is expected to succeed without
    /// intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors raised by a [`StateStore`](crate::domain::ports::StateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors from the dedup engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DedupError {
    #[error("Stored state uses the {stored} strategy but the trigger uses {expected}")]
    StrategyMismatch {
        expected: DedupStrategy,
        stored: DedupStrategy,
    },
}

/// Raised by an [`EmitSink`](crate::domain::ports::EmitSink) that could not
/// hand items to the consumer.
#[derive(Debug, Error)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Top-level error for trigger lifecycle operations.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dedup(#[from] DedupError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub type TriggerResult<T> = Result<T, TriggerError>;
