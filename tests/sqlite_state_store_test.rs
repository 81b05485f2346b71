//! Trigger state persisted in SQLite survives a process restart.

mod helpers;

use std::sync::Arc;

use helpers::{at, ctx, keyed, lifecycle, NOW};
use pollgate::adapters::plugins::StaticItemSource;
use pollgate::adapters::sqlite::{initialize_database, SqliteStateStore};
use pollgate::{DedupState, DedupStrategy, StateStore};

fn database_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite:{}", dir.path().join("state").join("pollgate.db").display())
}

#[tokio::test]
async fn test_state_survives_reopening_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = database_url(&dir);
    let ctx = ctx("flow-1/new-pin");

    {
        let pool = initialize_database(&url, None).await.unwrap();
        let store = Arc::new(SqliteStateStore::new(pool.clone()));
        let source = Arc::new(StaticItemSource::new("pins", vec![vec![]]));
        let trigger = lifecycle(DedupStrategy::Timebased, source.clone(), store);

        trigger.on_enable(&ctx).await.unwrap();
        source.set_pages(vec![vec![at("a", NOW + 10)]]);
        assert_eq!(trigger.poll(&ctx).await.unwrap().len(), 1);
        pool.close().await;
    }

    let pool = initialize_database(&url, None).await.unwrap();
    let store = Arc::new(SqliteStateStore::new(pool));
    assert_eq!(
        store.get(&ctx.instance).await.unwrap(),
        Some(DedupState::timebased(NOW + 10))
    );

    // A restarted poller does not redeliver.
    let source = Arc::new(StaticItemSource::new("pins", vec![vec![at("a", NOW + 10)]]));
    let trigger = lifecycle(DedupStrategy::Timebased, source, store);
    assert!(trigger.poll(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_last_item_snapshot_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let pool = initialize_database(&database_url(&dir), None).await.unwrap();
    let store = Arc::new(SqliteStateStore::new(pool));
    let source = Arc::new(StaticItemSource::new(
        "followers",
        vec![vec![keyed("u1"), keyed("u2")], vec![keyed("u3")]],
    ));
    let trigger = lifecycle(DedupStrategy::LastItem, source.clone(), store.clone());
    let ctx = ctx("flow-2/new-follower");

    trigger.on_enable(&ctx).await.unwrap();
    source.set_pages(vec![vec![keyed("u4"), keyed("u2")], vec![keyed("u3")]]);
    let emitted = trigger.poll_report(&ctx).await.unwrap().emitted;

    assert_eq!(emitted, vec![keyed("u4")]);
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, ctx.instance);
    assert_eq!(
        store.get(&ctx.instance).await.unwrap(),
        Some(DedupState::last_item(["u2", "u3", "u4"]))
    );
}
