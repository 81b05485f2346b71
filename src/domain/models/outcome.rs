//! Results of a single poll or test invocation.

use serde::Serialize;

use super::candidate::Candidate;
use super::dedup_state::DedupState;

/// Why pagination ended for a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// The source reported no further page.
    Exhausted,
    /// The per-tick page budget was used up.
    BudgetReached,
    /// A time-based page held nothing newer than the high-water-mark.
    CaughtUp,
    /// A page fetch failed; earlier pages of the tick were kept.
    FetchFailed(String),
}

impl StopReason {
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

/// Counters describing how a tick went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Candidates returned by the source across all pages.
    pub fetched: usize,
    /// Malformed candidates discarded by the dedup engine.
    pub dropped: usize,
    pub pages_fetched: u32,
    pub stop: StopReason,
    /// The tick established a baseline instead of emitting.
    pub baselined: bool,
    pub state_written: bool,
}

/// Result of one `poll` or `test` invocation.
///
/// `emitted` is ordered as it must be delivered. `next_state` is the state
/// the store holds (or, for `test`, would hold) after the tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOutcome {
    pub emitted: Vec<Candidate>,
    pub next_state: DedupState,
    pub stats: PollStats,
}

impl PollOutcome {
    /// The consumer-facing payloads, in emission order.
    pub fn into_payloads(self) -> Vec<serde_json::Value> {
        self.emitted.into_iter().map(|c| c.payload).collect()
    }
}
