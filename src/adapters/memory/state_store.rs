use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::StoreError;
use crate::domain::models::{DedupState, InstanceKey};
use crate::domain::ports::StateStore;

/// [`StateStore`] backed by a map in memory.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<InstanceKey, DedupState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances with persisted state.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, instance: &InstanceKey) -> Result<Option<DedupState>, StoreError> {
        Ok(self.states.read().await.get(instance).cloned())
    }

    async fn put(&self, instance: &InstanceKey, state: &DedupState) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(instance.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, instance: &InstanceKey) -> Result<(), StoreError> {
        self.states.write().await.remove(instance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instances_are_partitioned() {
        let store = InMemoryStateStore::new();
        let a = InstanceKey::new("a");
        let b = InstanceKey::new("b");

        store.put(&a, &DedupState::timebased(1)).await.unwrap();
        store.put(&b, &DedupState::last_item(["x"])).await.unwrap();
        store.delete(&a).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap(), None);
        assert_eq!(store.get(&b).await.unwrap(), Some(DedupState::last_item(["x"])));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = InMemoryStateStore::new();
        store.delete(&InstanceKey::new("ghost")).await.unwrap();
        assert!(store.is_empty().await);
    }
}
