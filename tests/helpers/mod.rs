//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pollgate::adapters::plugins::StaticItemSource;
use pollgate::domain::ports::FixedClock;
use pollgate::{
    Candidate, DedupState, DedupStrategy, InstanceKey, PageController, PagePolicy, StateStore,
    StoreError, TriggerContext, TriggerLifecycle,
};
use serde_json::json;

pub const NOW: i64 = 1_700_000_000_000;

pub fn at(key: &str, ts: i64) -> Candidate {
    Candidate::timestamped(key, ts, json!({ "id": key, "ts": ts }))
}

pub fn keyed(key: &str) -> Candidate {
    Candidate::new(key, json!({ "id": key }))
}

pub fn ctx(instance: &str) -> TriggerContext {
    TriggerContext::new(instance)
}

/// Lifecycle with a fixed clock at [`NOW`] and no pacing.
pub fn lifecycle(
    strategy: DedupStrategy,
    source: Arc<StaticItemSource>,
    store: Arc<dyn StateStore>,
) -> TriggerLifecycle {
    TriggerLifecycle::new(strategy, source, store)
        .with_clock(Arc::new(FixedClock::new(NOW)))
        .with_page_controller(PageController::new(PagePolicy::new(10, Duration::ZERO)))
}

/// A store whose every call fails as unavailable.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl StateStore for UnavailableStore {
    async fn get(&self, _instance: &InstanceKey) -> Result<Option<DedupState>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn put(&self, _instance: &InstanceKey, _state: &DedupState) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn delete(&self, _instance: &InstanceKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}
