use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::DeliveryError;
use crate::domain::models::{Candidate, InstanceKey};
use crate::domain::ports::EmitSink;

/// [`EmitSink`] that records delivered items, or rejects every delivery.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Candidate>>>,
    reject_with: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries always fail with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            delivered: Arc::default(),
            reject_with: Some(reason.into()),
        }
    }

    /// Everything delivered so far, in delivery order.
    pub async fn delivered(&self) -> Vec<Candidate> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl EmitSink for MemorySink {
    async fn deliver(&self, instance: &InstanceKey, items: &[Candidate]) -> Result<(), DeliveryError> {
        if let Some(reason) = &self.reject_with {
            return Err(DeliveryError(format!("{instance}: {reason}")));
        }
        self.delivered.lock().await.extend_from_slice(items);
        Ok(())
    }
}
