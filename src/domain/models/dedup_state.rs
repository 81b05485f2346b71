//! Persisted deduplication state.
//!
//! Each trigger instance owns exactly one [`DedupState`]. The variant is the
//! strategy: a time-based trigger keeps a high-water-mark, a last-item
//! trigger keeps the key snapshot of its most recent fetch. Serialized with
//! an internal `strategy` tag so a stored blob always says which shape it is.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How a trigger decides which candidates are new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// New means created after the last recorded high-water-mark.
    Timebased,
    /// New means absent from the previous fetch's key snapshot.
    LastItem,
}

impl DedupStrategy {
    /// Returns the string representation of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timebased => "timebased",
            Self::LastItem => "last_item",
        }
    }

    /// Parse a strategy from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "timebased" | "time_based" | "time-based" => Some(Self::Timebased),
            "last_item" | "last-item" | "lastitem" => Some(Self::LastItem),
            _ => None,
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High-water-mark for [`DedupStrategy::Timebased`].
///
/// Never decreases across successful polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimebasedState {
    pub last_fetch_epoch_ms: i64,
}

/// Key snapshot for [`DedupState::LastItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastItemState {
    pub last_seen_keys: BTreeSet<String>,
}

/// Persisted dedup bookkeeping for one trigger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DedupState {
    Timebased(TimebasedState),
    LastItem(LastItemState),
}

impl DedupState {
    /// A time-based state at the given mark.
    pub fn timebased(last_fetch_epoch_ms: i64) -> Self {
        Self::Timebased(TimebasedState {
            last_fetch_epoch_ms,
        })
    }

    /// A last-item state holding `keys`.
    pub fn last_item<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::LastItem(LastItemState {
            last_seen_keys: keys.into_iter().map(Into::into).collect(),
        })
    }

    /// State that has seen nothing: every candidate counts as new against it.
    pub fn initial(strategy: DedupStrategy) -> Self {
        match strategy {
            DedupStrategy::Timebased => Self::timebased(i64::MIN),
            DedupStrategy::LastItem => Self::LastItem(LastItemState::default()),
        }
    }

    /// The strategy this state belongs to.
    pub fn strategy(&self) -> DedupStrategy {
        match self {
            Self::Timebased(_) => DedupStrategy::Timebased,
            Self::LastItem(_) => DedupStrategy::LastItem,
        }
    }

    pub fn as_timebased(&self) -> Option<&TimebasedState> {
        match self {
            Self::Timebased(state) => Some(state),
            Self::LastItem(_) => None,
        }
    }

    pub fn as_last_item(&self) -> Option<&LastItemState> {
        match self {
            Self::LastItem(state) => Some(state),
            Self::Timebased(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strategy_from_str_accepts_aliases() {
        assert_eq!(DedupStrategy::from_str("TIMEBASED"), Some(DedupStrategy::Timebased));
        assert_eq!(DedupStrategy::from_str("last-item"), Some(DedupStrategy::LastItem));
        assert_eq!(DedupStrategy::from_str("newest"), None);
    }

    #[test]
    fn test_timebased_state_is_tagged() {
        let value = serde_json::to_value(DedupState::timebased(42)).unwrap();
        assert_eq!(value, json!({"strategy": "timebased", "last_fetch_epoch_ms": 42}));
    }

    #[test]
    fn test_last_item_state_is_tagged_and_sorted() {
        let value = serde_json::to_value(DedupState::last_item(["b", "a"])).unwrap();
        assert_eq!(value, json!({"strategy": "last_item", "last_seen_keys": ["a", "b"]}));
    }

    #[test]
    fn test_untagged_blob_is_rejected() {
        let parsed = serde_json::from_value::<DedupState>(json!({"last_fetch_epoch_ms": 42}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_initial_state_matches_strategy() {
        for strategy in [DedupStrategy::Timebased, DedupStrategy::LastItem] {
            assert_eq!(DedupState::initial(strategy).strategy(), strategy);
        }
    }
}
