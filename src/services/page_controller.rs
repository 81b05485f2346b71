//! Bounded, paced pagination over an [`ItemSource`].
//!
//! One [`PageController::run`] call drives a source through the pages of a
//! single tick. The page budget bounds tick latency and memory, and also
//! stops a misbehaving source that never ends pagination. A governor rate
//! limiter whose period equals the pacing delay spaces out the fetches.

use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::domain::errors::SourceError;
use crate::domain::models::{
    Candidate, DedupState, DedupStrategy, PagePolicy, StopReason, TriggerContext,
};
use crate::domain::ports::{ItemSource, PageCursor};

type PaceLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Candidates gathered over one tick's pages.
#[derive(Debug)]
pub struct PageRun {
    pub candidates: Vec<Candidate>,
    pub pages_fetched: u32,
    pub stop: StopReason,
    /// The fetch error that ended the run, if any.
    pub error: Option<SourceError>,
}

impl PageRun {
    /// The run failed before any page arrived.
    pub fn failed_outright(&self) -> bool {
        self.pages_fetched == 0 && self.error.is_some()
    }
}

/// Drives an item source within a [`PagePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct PageController {
    policy: PagePolicy,
}

impl PageController {
    pub fn new(policy: PagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PagePolicy {
        self.policy
    }

    /// Same pacing, smaller budget.
    pub fn limited_to(self, max_pages: u32) -> Self {
        Self::new(self.policy.with_max_pages(max_pages.min(self.policy.max_pages)))
    }

    /// A fresh limiter per tick, so the first page of a tick is never held back.
    fn pacer(&self) -> Option<PaceLimiter> {
        if self.policy.pace == Duration::ZERO {
            return None;
        }
        Quota::with_period(self.policy.pace).map(RateLimiter::direct)
    }

    /// Fetch pages until the source is exhausted, the budget is used, a
    /// time-based page shows nothing new, or a fetch fails.
    ///
    /// A failed fetch never discards earlier pages: they are returned with
    /// [`StopReason::FetchFailed`] and the error.
    pub async fn run(
        &self,
        source: &dyn ItemSource,
        ctx: &TriggerContext,
        strategy: DedupStrategy,
        prior: Option<&DedupState>,
    ) -> PageRun {
        let pacer = self.pacer();
        let high_water = match (strategy, prior) {
            (DedupStrategy::Timebased, Some(DedupState::Timebased(state))) => {
                Some(state.last_fetch_epoch_ms)
            }
            _ => None,
        };

        let mut candidates = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        let mut pages_fetched = 0u32;
        let mut error = None;

        let stop = loop {
            if pages_fetched >= self.policy.max_pages {
                tracing::warn!(
                    source = source.name(),
                    instance = %ctx.instance,
                    max_pages = self.policy.max_pages,
                    "Page budget reached with more pages pending"
                );
                break StopReason::BudgetReached;
            }

            if let Some(limiter) = &pacer {
                limiter.until_ready().await;
            }

            match source.fetch_page(ctx, prior, cursor.as_ref()).await {
                Ok(page) => {
                    pages_fetched += 1;
                    let caught_up =
                        high_water.is_some_and(|mark| holds_nothing_newer(&page.candidates, mark));

                    tracing::debug!(
                        source = source.name(),
                        page = pages_fetched,
                        count = page.candidates.len(),
                        has_next = page.next_cursor.is_some(),
                        "Fetched page"
                    );
                    candidates.extend(page.candidates);

                    if caught_up {
                        break StopReason::CaughtUp;
                    }
                    match page.next_cursor {
                        Some(next) => cursor = Some(next),
                        None => break StopReason::Exhausted,
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        source = source.name(),
                        instance = %ctx.instance,
                        page = pages_fetched + 1,
                        kept = candidates.len(),
                        error = %err,
                        "Page fetch failed, keeping pages fetched so far"
                    );
                    let reason = StopReason::FetchFailed(err.to_string());
                    error = Some(err);
                    break reason;
                }
            }
        };

        PageRun {
            candidates,
            pages_fetched,
            stop,
            error,
        }
    }
}

impl Default for PageController {
    fn default() -> Self {
        Self::new(PagePolicy::default())
    }
}

/// Whether a non-empty page holds only candidates at or before `mark`.
///
/// Candidates without a timestamp cannot be new for a time-based trigger.
fn holds_nothing_newer(candidates: &[Candidate], mark: i64) -> bool {
    !candidates.is_empty()
        && candidates
            .iter()
            .all(|c| c.timestamp_ms.map_or(true, |ts| ts <= mark))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::adapters::plugins::StaticItemSource;
    use serde_json::json;

    fn at(key: &str, ts: i64) -> Candidate {
        Candidate::timestamped(key, ts, json!({}))
    }

    fn unpaced(max_pages: u32) -> PageController {
        PageController::new(PagePolicy::new(max_pages, Duration::ZERO))
    }

    fn ctx() -> TriggerContext {
        TriggerContext::new("pager-test")
    }

    #[tokio::test]
    async fn test_reads_until_exhausted() {
        let source = StaticItemSource::new(
            "static",
            vec![vec![at("a", 3)], vec![at("b", 2)], vec![at("c", 1)]],
        );
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::Timebased, None)
            .await;

        assert_eq!(run.pages_fetched, 3);
        assert_eq!(run.stop, StopReason::Exhausted);
        assert_eq!(run.candidates.len(), 3);
        assert!(run.error.is_none());
    }

    #[tokio::test]
    async fn test_stops_at_budget() {
        let pages = (0..20).map(|i| vec![at(&format!("k{i}"), 100 - i)]).collect();
        let source = StaticItemSource::new("endless", pages);
        let run = unpaced(4)
            .run(&source, &ctx(), DedupStrategy::LastItem, None)
            .await;

        assert_eq!(run.pages_fetched, 4);
        assert_eq!(run.stop, StopReason::BudgetReached);
        assert_eq!(source.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_timebased_stops_once_caught_up() {
        let source = StaticItemSource::new(
            "newest-first",
            vec![
                vec![at("e", 50), at("d", 40)],
                vec![at("c", 30), at("b", 20)],
                vec![at("a", 10)],
            ],
        );
        let prior = DedupState::timebased(30);
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::Timebased, Some(&prior))
            .await;

        assert_eq!(run.pages_fetched, 2);
        assert_eq!(run.stop, StopReason::CaughtUp);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_last_item_never_stops_early() {
        let source = StaticItemSource::new("snapshot", vec![vec![at("a", 1)], vec![at("b", 1)]]);
        let prior = DedupState::last_item(["a"]);
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::LastItem, Some(&prior))
            .await;
        assert_eq!(run.pages_fetched, 2);
        assert_eq!(run.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_empty_page_does_not_trigger_early_stop() {
        let source = StaticItemSource::new("sparse", vec![vec![], vec![at("a", 100)]]);
        let prior = DedupState::timebased(10);
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::Timebased, Some(&prior))
            .await;
        assert_eq!(run.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_earlier_pages() {
        let source = StaticItemSource::new(
            "flaky",
            vec![vec![at("c", 30)], vec![at("b", 20)], vec![at("a", 10)]],
        )
        .failing_at(1);
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::Timebased, None)
            .await;

        assert_eq!(run.pages_fetched, 1);
        assert!(run.stop.is_partial());
        assert_eq!(run.candidates.len(), 1);
        assert!(run.error.is_some());
        assert!(!run.failed_outright());
    }

    #[tokio::test]
    async fn test_failure_on_first_page_is_outright() {
        let source = StaticItemSource::new("down", vec![vec![at("a", 1)]]).failing_at(0);
        let run = unpaced(10)
            .run(&source, &ctx(), DedupStrategy::Timebased, None)
            .await;
        assert!(run.failed_outright());
        assert!(run.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_pacing_spaces_out_fetches() {
        let source = StaticItemSource::new("paced", vec![vec![], vec![], vec![]]);
        let controller = PageController::new(PagePolicy::new(10, Duration::from_millis(20)));

        let started = Instant::now();
        let run = controller
            .run(&source, &ctx(), DedupStrategy::LastItem, None)
            .await;

        assert_eq!(run.pages_fetched, 3);
        // Two gaps between three fetches.
        assert!(started.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_limited_to_never_raises_budget() {
        let controller = unpaced(3);
        assert_eq!(controller.limited_to(1).policy().max_pages, 1);
        assert_eq!(controller.limited_to(50).policy().max_pages, 3);
    }
}
