use std::collections::{BTreeSet, HashSet};

use pollgate::domain::models::{LastItemState, TimebasedState};
use pollgate::services::dedup_engine::{dedupe_last_item, dedupe_timebased};
use pollgate::{Candidate, DedupState};
use proptest::prelude::*;
use serde_json::Value;

fn candidates(max_len: usize) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-h]{1,2}", 0i64..1_000), 0..max_len)
}

fn to_candidates(raw: &[(String, i64)]) -> Vec<Candidate> {
    raw.iter()
        .map(|(key, ts)| Candidate::timestamped(key.clone(), *ts, Value::Null))
        .collect()
}

proptest! {
    /// Property: nothing is delivered twice across consecutive ticks
    ///
    /// Replaying the first tick's candidates alongside new ones never
    /// re-emits a (key, timestamp) pair that was already emitted.
    #[test]
    fn prop_timebased_never_redelivers(
        first in candidates(30),
        second in candidates(30),
        start in -10i64..500,
    ) {
        let prior = TimebasedState { last_fetch_epoch_ms: start };
        let tick1 = dedupe_timebased(to_candidates(&first), prior);
        let Some(mid) = tick1.next_state.as_timebased().copied() else {
            return Err(TestCaseError::fail("wrong strategy"));
        };

        let mut replay = first.clone();
        replay.extend(second.iter().cloned());
        let tick2 = dedupe_timebased(to_candidates(&replay), mid);

        let delivered: HashSet<(String, i64)> = tick1
            .new_items
            .iter()
            .map(|c| (c.key.clone(), c.timestamp_ms.unwrap_or_default()))
            .collect();
        for item in &tick2.new_items {
            let pair = (item.key.clone(), item.timestamp_ms.unwrap_or_default());
            prop_assert!(!delivered.contains(&pair));
        }
        prop_assert!(mid.last_fetch_epoch_ms >= start);
    }

    /// Property: emissions are ordered oldest first
    #[test]
    fn prop_timebased_emits_in_ascending_order(raw in candidates(40)) {
        let outcome = dedupe_timebased(to_candidates(&raw), TimebasedState { last_fetch_epoch_ms: 100 });
        let stamps: Vec<(i64, String)> = outcome
            .new_items
            .iter()
            .map(|c| (c.timestamp_ms.unwrap_or_default(), c.key.clone()))
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        prop_assert_eq!(stamps, sorted);
    }

    /// Property: last-item emits exactly the set difference
    #[test]
    fn prop_last_item_is_set_difference(
        prior in prop::collection::btree_set("[a-j]", 0..10),
        fetched in prop::collection::vec("[a-j]", 0..20),
    ) {
        let state = LastItemState { last_seen_keys: prior.clone() };
        let outcome = dedupe_last_item(
            fetched.iter().map(|k| Candidate::new(k.clone(), Value::Null)).collect(),
            &state,
        );

        let fetched_set: BTreeSet<String> = fetched.iter().cloned().collect();
        let expected: BTreeSet<String> = fetched_set.difference(&prior).cloned().collect();
        let emitted: Vec<String> = outcome.new_items.iter().map(|c| c.key.clone()).collect();
        let emitted_set: BTreeSet<String> = emitted.iter().cloned().collect();

        prop_assert_eq!(emitted.len(), emitted_set.len());
        prop_assert_eq!(emitted_set, expected);
        prop_assert_eq!(outcome.next_state, DedupState::LastItem(LastItemState { last_seen_keys: fetched_set }));
    }
}
