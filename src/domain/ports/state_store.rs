//! State store port.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::{DedupState, InstanceKey};

/// Repository interface for per-instance dedup state.
///
/// Implementations must survive process restarts to be useful in
/// production. Keys are partitioned per trigger instance; the engine never
/// reads or writes another instance's entry.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the state for an instance
    ///
    /// # Returns
    /// * `Ok(Some(state))` if persisted
    /// * `Ok(None)` if the instance has no state (disabled or never enabled)
    /// * `Err(StoreError)` if the store could not be read
    async fn get(&self, instance: &InstanceKey) -> Result<Option<DedupState>, StoreError>;

    /// Insert or replace the state for an instance
    async fn put(&self, instance: &InstanceKey, state: &DedupState) -> Result<(), StoreError>;

    /// Remove the state for an instance
    ///
    /// Deleting an absent entry is not an error.
    async fn delete(&self, instance: &InstanceKey) -> Result<(), StoreError>;
}
