//! Emit sink port.

use async_trait::async_trait;

use crate::domain::errors::DeliveryError;
use crate::domain::models::{Candidate, InstanceKey};

/// Receives the items a poll found to be new.
///
/// Used by [`TriggerLifecycle::poll_into`](crate::services::TriggerLifecycle::poll_into):
/// state is persisted only after `deliver` returns `Ok`, so a failed
/// delivery is retried with the same items on the next tick.
#[async_trait]
pub trait EmitSink: Send + Sync {
    async fn deliver(&self, instance: &InstanceKey, items: &[Candidate]) -> Result<(), DeliveryError>;
}
