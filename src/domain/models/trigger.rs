//! Trigger instance identity, invocation context and paging policy.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::PollingConfig;

/// Default number of pages fetched per tick.
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Default delay between successive page fetches within one tick.
pub const DEFAULT_PAGE_PACE: Duration = Duration::from_millis(100);

/// Identifies one trigger instance; partitions the state store key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for InstanceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Credentials passed through to the item source on every call.
///
/// The engine never inspects these; `Debug` output redacts them.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    fields: HashMap<String, String>,
}

impl AuthCredentials {
    /// No credentials.
    pub fn none() -> Self {
        Self::default()
    }

    /// A bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            fields: HashMap::new(),
        }
    }

    /// Add an integration-specific credential field (API key, account id).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything a lifecycle operation needs about the instance it runs for.
///
/// Threaded explicitly through every call instead of living in ambient
/// state.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub instance: InstanceKey,
    pub auth: AuthCredentials,
    /// User-facing trigger configuration (board id, folder, search query).
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl TriggerContext {
    pub fn new(instance: impl Into<InstanceKey>) -> Self {
        Self {
            instance: instance.into(),
            auth: AuthCredentials::none(),
            config: serde_json::Map::new(),
        }
    }

    pub fn with_auth(mut self, auth: AuthCredentials) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Read a string-valued config entry.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Lifecycle state of a trigger instance, derived from whether dedup state
/// is persisted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Disabled,
    Enabled,
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Enabled => f.write_str("enabled"),
        }
    }
}

/// Per-integration bounds on one tick's pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    /// Maximum pages fetched per tick. Always at least 1.
    pub max_pages: u32,
    /// Minimum spacing between page fetches. Zero disables pacing.
    pub pace: Duration,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            pace: DEFAULT_PAGE_PACE,
        }
    }
}

impl PagePolicy {
    pub fn new(max_pages: u32, pace: Duration) -> Self {
        Self {
            max_pages: max_pages.max(1),
            pace,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }
}

impl From<&PollingConfig> for PagePolicy {
    fn from(config: &PollingConfig) -> Self {
        Self::new(config.max_pages, Duration::from_millis(config.pace_ms))
    }
}
