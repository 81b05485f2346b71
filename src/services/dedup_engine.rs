//! Deduplication of polled candidates against persisted trigger state.
//!
//! Everything here is synchronous and free of I/O. Given the candidates one
//! tick fetched and the state persisted by the previous tick, [`dedupe`]
//! decides which candidates are new, orders them for delivery and computes
//! the state to persist next.
//!
//! Time-based dedup trusts upstream timestamps: a record that later reports
//! an earlier timestamp than before is not redelivered, and one whose
//! timestamp moves forward is delivered again.

use std::collections::BTreeSet;

use crate::domain::errors::DedupError;
use crate::domain::models::{
    Candidate, DedupState, DedupStrategy, LastItemState, TimebasedState,
};

/// What one tick's candidates mean relative to the prior state.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// New candidates in delivery order.
    pub new_items: Vec<Candidate>,
    pub next_state: DedupState,
    /// Candidates discarded as malformed for the strategy.
    pub dropped: usize,
}

/// Split `candidates` into new items and the next state.
///
/// Fails only when `prior` belongs to a different strategy.
pub fn dedupe(
    strategy: DedupStrategy,
    candidates: Vec<Candidate>,
    prior: &DedupState,
) -> Result<DedupOutcome, DedupError> {
    match (strategy, prior) {
        (DedupStrategy::Timebased, DedupState::Timebased(state)) => {
            Ok(dedupe_timebased(candidates, *state))
        }
        (DedupStrategy::LastItem, DedupState::LastItem(state)) => {
            Ok(dedupe_last_item(candidates, state))
        }
        (expected, stored) => Err(DedupError::StrategyMismatch {
            expected,
            stored: stored.strategy(),
        }),
    }
}

/// Emit candidates newer than the high-water-mark, oldest first.
///
/// Ties on timestamp are ordered by key. The next mark is the maximum
/// timestamp over every candidate fetched, emitted or not, so a source that
/// always returns the same recent window does not rescan it forever.
pub fn dedupe_timebased(candidates: Vec<Candidate>, prior: TimebasedState) -> DedupOutcome {
    let mut high_water = prior.last_fetch_epoch_ms;
    let mut dropped = 0;
    let mut fresh: Vec<(i64, Candidate)> = Vec::new();

    for candidate in candidates {
        let Some(timestamp_ms) = candidate.timestamp_ms else {
            tracing::warn!(
                key = %candidate.key,
                "Dropping time-based candidate without a timestamp"
            );
            dropped += 1;
            continue;
        };

        high_water = high_water.max(timestamp_ms);
        if timestamp_ms > prior.last_fetch_epoch_ms {
            fresh.push((timestamp_ms, candidate));
        }
    }

    fresh.sort_by(|(a_ts, a), (b_ts, b)| a_ts.cmp(b_ts).then_with(|| a.key.cmp(&b.key)));
    // Overlapping pages can return the same record twice in one tick.
    fresh.dedup_by(|(a_ts, a), (b_ts, b)| a_ts == b_ts && a.key == b.key);

    DedupOutcome {
        new_items: fresh.into_iter().map(|(_, candidate)| candidate).collect(),
        next_state: DedupState::Timebased(TimebasedState {
            last_fetch_epoch_ms: high_water,
        }),
        dropped,
    }
}

/// Emit candidates whose key was not in the previous snapshot, in the
/// source's order.
///
/// The next snapshot is exactly the keys fetched now, so a key that drops
/// out of the feed and later returns is new again.
pub fn dedupe_last_item(candidates: Vec<Candidate>, prior: &LastItemState) -> DedupOutcome {
    let mut snapshot = BTreeSet::new();
    let mut new_items = Vec::new();

    for candidate in candidates {
        if !snapshot.insert(candidate.key.clone()) {
            continue;
        }
        if !prior.last_seen_keys.contains(&candidate.key) {
            new_items.push(candidate);
        }
    }

    DedupOutcome {
        new_items,
        next_state: DedupState::LastItem(LastItemState {
            last_seen_keys: snapshot,
        }),
        dropped: 0,
    }
}

/// The state to persist when a tick did not see the whole feed.
///
/// A last-item snapshot built from a partial fetch would forget keys on
/// the pages that were never read, and they would come back as new next
/// tick. Keep the prior keys alongside the ones fetched.
///
/// Pages run newest first, so a time-based mark may only advance when the
/// fetched pages reach back to the prior mark. Otherwise the unread pages
/// hold records between the prior mark and the oldest fetched one, and the
/// prior mark is kept so the next tick reads them. The fetched items are
/// then delivered again on that tick.
pub fn carry_over_partial(prior: &DedupState, next: DedupState, reached_prior: bool) -> DedupState {
    match (prior, next) {
        (DedupState::LastItem(prior), DedupState::LastItem(mut next)) => {
            next.last_seen_keys
                .extend(prior.last_seen_keys.iter().cloned());
            DedupState::LastItem(next)
        }
        (DedupState::Timebased(mark), DedupState::Timebased(_)) if !reached_prior => {
            DedupState::Timebased(*mark)
        }
        (_, next) => next,
    }
}

/// Whether `candidates` include a record at or before the prior mark.
///
/// Always true for last-item state, which has no mark.
pub fn reaches_prior(prior: &DedupState, candidates: &[Candidate]) -> bool {
    match prior {
        DedupState::Timebased(mark) => candidates
            .iter()
            .filter_map(|c| c.timestamp_ms)
            .any(|ts| ts <= mark.last_fetch_epoch_ms),
        DedupState::LastItem(_) => true,
    }
}

/// The state that suppresses everything `candidates` already shows.
///
/// Time-based baselines take the later of `now_ms` and the newest fetched
/// timestamp, so neither the backlog nor records stamped slightly in the
/// future flood the first poll. Returns the state and the number of
/// malformed candidates ignored.
pub fn baseline_state(
    strategy: DedupStrategy,
    candidates: &[Candidate],
    now_ms: i64,
) -> (DedupState, usize) {
    match strategy {
        DedupStrategy::Timebased => {
            let dropped = candidates.iter().filter(|c| c.timestamp_ms.is_none()).count();
            let newest = candidates.iter().filter_map(|c| c.timestamp_ms).max();
            let mark = newest.map_or(now_ms, |ts| ts.max(now_ms));
            (DedupState::timebased(mark), dropped)
        }
        DedupStrategy::LastItem => (
            DedupState::last_item(candidates.iter().map(|c| c.key.clone())),
            0,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(key: &str, ts: i64) -> Candidate {
        Candidate::timestamped(key, ts, json!({ "id": key }))
    }

    fn keyed(key: &str) -> Candidate {
        Candidate::new(key, json!({ "id": key }))
    }

    fn keys(items: &[Candidate]) -> Vec<&str> {
        items.iter().map(|c| c.key.as_str()).collect()
    }

    // ── Time-based ──────────────────────────────────────────────────────────

    #[test]
    fn test_timebased_filters_and_sorts_ascending() {
        let prior = TimebasedState { last_fetch_epoch_ms: 100 };
        let outcome = dedupe_timebased(vec![at("c", 300), at("old", 50), at("b", 200)], prior);

        assert_eq!(keys(&outcome.new_items), vec!["b", "c"]);
        assert_eq!(outcome.next_state, DedupState::timebased(300));
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn test_timebased_boundary_is_exclusive() {
        let prior = TimebasedState { last_fetch_epoch_ms: 100 };
        let outcome = dedupe_timebased(vec![at("same", 100)], prior);
        assert!(outcome.new_items.is_empty());
        assert_eq!(outcome.next_state, DedupState::timebased(100));
    }

    #[test]
    fn test_timebased_ties_are_ordered_by_key() {
        let prior = TimebasedState { last_fetch_epoch_ms: 0 };
        let first = dedupe_timebased(vec![at("z", 10), at("a", 10), at("m", 10)], prior);
        let second = dedupe_timebased(vec![at("m", 10), at("z", 10), at("a", 10)], prior);

        assert_eq!(keys(&first.new_items), vec!["a", "m", "z"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_timebased_collapses_repeated_record() {
        let prior = TimebasedState { last_fetch_epoch_ms: 0 };
        let outcome = dedupe_timebased(vec![at("a", 10), at("b", 20), at("a", 10)], prior);
        assert_eq!(keys(&outcome.new_items), vec!["a", "b"]);
    }

    #[test]
    fn test_timebased_empty_tick_keeps_state() {
        let prior = TimebasedState { last_fetch_epoch_ms: 7 };
        let outcome = dedupe_timebased(Vec::new(), prior);
        assert!(outcome.new_items.is_empty());
        assert_eq!(outcome.next_state, DedupState::Timebased(prior));
    }

    #[test]
    fn test_timebased_mark_never_decreases() {
        let prior = TimebasedState { last_fetch_epoch_ms: 1_000 };
        let outcome = dedupe_timebased(vec![at("stale", 10)], prior);
        assert_eq!(outcome.next_state, DedupState::timebased(1_000));
    }

    #[test]
    fn test_timebased_drops_candidates_without_timestamp() {
        let prior = TimebasedState { last_fetch_epoch_ms: 0 };
        let outcome = dedupe_timebased(vec![keyed("broken"), at("ok", 5)], prior);

        assert_eq!(keys(&outcome.new_items), vec!["ok"]);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.next_state, DedupState::timebased(5));
    }

    // ── Last item ───────────────────────────────────────────────────────────

    #[test]
    fn test_last_item_emits_set_difference() {
        let prior = LastItemState {
            last_seen_keys: ["A", "B", "C"].into_iter().map(String::from).collect(),
        };
        let outcome = dedupe_last_item(vec![keyed("A"), keyed("B"), keyed("D")], &prior);

        assert_eq!(keys(&outcome.new_items), vec!["D"]);
        assert_eq!(outcome.next_state, DedupState::last_item(["A", "B", "D"]));
    }

    #[test]
    fn test_last_item_preserves_source_order() {
        let outcome = dedupe_last_item(
            vec![keyed("z"), keyed("a"), keyed("m")],
            &LastItemState::default(),
        );
        assert_eq!(keys(&outcome.new_items), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_last_item_vanished_key_is_new_again() {
        let prior = LastItemState::default();
        let first = dedupe_last_item(vec![keyed("A"), keyed("B")], &prior);
        let DedupState::LastItem(after_first) = first.next_state else {
            panic!("expected last-item state");
        };

        let second = dedupe_last_item(vec![keyed("B")], &after_first);
        let DedupState::LastItem(after_second) = second.next_state else {
            panic!("expected last-item state");
        };

        let third = dedupe_last_item(vec![keyed("A"), keyed("B")], &after_second);
        assert_eq!(keys(&third.new_items), vec!["A"]);
    }

    #[test]
    fn test_last_item_duplicate_key_emitted_once() {
        let outcome = dedupe_last_item(
            vec![keyed("A"), keyed("A")],
            &LastItemState::default(),
        );
        assert_eq!(outcome.new_items.len(), 1);
    }

    // ── Dispatch and helpers ────────────────────────────────────────────────

    #[test]
    fn test_dedupe_rejects_strategy_mismatch() {
        let err = dedupe(DedupStrategy::Timebased, vec![], &DedupState::last_item(["A"]))
            .unwrap_err();
        assert_eq!(
            err,
            DedupError::StrategyMismatch {
                expected: DedupStrategy::Timebased,
                stored: DedupStrategy::LastItem,
            }
        );
    }

    #[test]
    fn test_initial_state_treats_everything_as_new() {
        let outcome = dedupe(
            DedupStrategy::Timebased,
            vec![at("b", 2), at("a", 1)],
            &DedupState::initial(DedupStrategy::Timebased),
        )
        .unwrap();
        assert_eq!(keys(&outcome.new_items), vec!["a", "b"]);
    }

    #[test]
    fn test_carry_over_partial_unions_last_item_keys() {
        let prior = DedupState::last_item(["A", "B"]);
        let merged = carry_over_partial(&prior, DedupState::last_item(["C"]), true);
        assert_eq!(merged, DedupState::last_item(["A", "B", "C"]));
    }

    #[test]
    fn test_carry_over_partial_advances_mark_when_prior_reached() {
        let prior = DedupState::timebased(10);
        let merged = carry_over_partial(&prior, DedupState::timebased(40), true);
        assert_eq!(merged, DedupState::timebased(40));
    }

    #[test]
    fn test_carry_over_partial_holds_mark_across_unread_gap() {
        let prior = DedupState::timebased(10);
        let merged = carry_over_partial(&prior, DedupState::timebased(40), false);
        assert_eq!(merged, prior);
    }

    #[test]
    fn test_reaches_prior_needs_record_at_or_before_mark() {
        let prior = DedupState::timebased(10);
        assert!(!reaches_prior(&prior, &[at("a", 30), keyed("b")]));
        assert!(reaches_prior(&prior, &[at("a", 30), at("b", 10)]));
        assert!(reaches_prior(&DedupState::last_item(["A"]), &[]));
    }

    #[test]
    fn test_baseline_timebased_uses_later_of_now_and_newest() {
        let (state, dropped) =
            baseline_state(DedupStrategy::Timebased, &[at("a", 500), keyed("b")], 100);
        assert_eq!(state, DedupState::timebased(500));
        assert_eq!(dropped, 1);

        let (state, _) = baseline_state(DedupStrategy::Timebased, &[at("a", 50)], 100);
        assert_eq!(state, DedupState::timebased(100));

        let (state, _) = baseline_state(DedupStrategy::Timebased, &[], 100);
        assert_eq!(state, DedupState::timebased(100));
    }

    #[test]
    fn test_baseline_last_item_snapshots_keys() {
        let (state, dropped) =
            baseline_state(DedupStrategy::LastItem, &[keyed("x"), keyed("y")], 0);
        assert_eq!(state, DedupState::last_item(["x", "y"]));
        assert_eq!(dropped, 0);
    }
}
