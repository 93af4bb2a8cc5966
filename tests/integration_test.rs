//! Integration tests for Somna
//!
//! These tests exercise the sleep record store end to end through its
//! public API:
//! - CRUD semantics (upsert, delete, delete-all)
//! - Ordering and date filtering
//! - Live query delivery after writes
//! - Strict date decoding and cancellation

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use somna_store::{Error, LiveQuery, SleepRecord, SleepRepository, SleepStore, StoreConfig};
use tokio_util::sync::CancellationToken;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn session(day: u32) -> SleepRecord {
    SleepRecord::new(at(day, 6), 6.0 + day as f32 / 4.0)
        .with_vitals(70, 55 + day as i32, 100 * day as i32)
        .with_stages(1.25, 3.5, 1.75)
}

async fn next_snapshot(live: &mut LiveQuery) -> Vec<SleepRecord> {
    tokio::time::timeout(Duration::from_secs(5), live.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("live query closed")
        .expect("live query failed")
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_insert_then_read_contains_exactly_one_equal_record() {
    let store = SleepStore::in_memory().await.unwrap();
    for day in [2, 4, 6] {
        let record = session(day);
        let id = store.insert(&record).await.unwrap();

        let all = store.all_sleep_data().await.unwrap();
        let matching: Vec<_> = all.iter().filter(|r| r.id == id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(*matching[0], record.with_id(id));
    }
}

#[tokio::test]
async fn test_duplicate_id_replaces_without_merging() {
    let store = SleepStore::in_memory().await.unwrap();
    let id = store.insert(&session(1)).await.unwrap();

    let replacement = SleepRecord::new(at(9, 23), 4.0).with_id(id);
    store.insert(&replacement).await.unwrap();

    let all = store.all_sleep_data().await.unwrap();
    assert_eq!(all, vec![replacement]);
    assert_eq!(all[0].heart_rate, 0);
    assert_eq!(all[0].deep_sleep_duration, 0.0);
}

#[tokio::test]
async fn test_delete_and_delete_all() {
    let store = SleepStore::in_memory().await.unwrap();
    let a = store.insert(&session(1)).await.unwrap();
    store.insert(&session(2)).await.unwrap();

    store.delete(&session(1).with_id(a)).await.unwrap();
    store.delete(&session(1).with_id(a)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    store.delete_all().await.unwrap();
    assert!(store.all_sleep_data().await.unwrap().is_empty());
    store.delete_all().await.unwrap();
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_reads_sorted_descending_for_any_insertion_order() {
    let orders: [[u32; 4]; 3] = [[1, 2, 3, 4], [4, 3, 2, 1], [3, 1, 4, 2]];

    for order in orders {
        let store = SleepStore::in_memory().await.unwrap();
        for day in order {
            store.insert(&session(day)).await.unwrap();
        }

        let all = store.all_sleep_data().await.unwrap();
        assert!(all.windows(2).all(|w| w[0].date >= w[1].date));

        let from = store.sleep_data_from_date(at(2, 6)).await.unwrap();
        let days: Vec<_> = from.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![at(4, 6), at(3, 6), at(2, 6)]);
    }
}

#[tokio::test]
async fn test_latest_on_empty_and_populated_table() {
    let store = SleepStore::in_memory().await.unwrap();
    assert_eq!(store.get_latest_sleep_data().await.unwrap(), None);

    store.insert(&session(1)).await.unwrap();
    store.insert(&session(2)).await.unwrap();
    let t3 = store.insert(&session(3)).await.unwrap();

    let latest = store.get_latest_sleep_data().await.unwrap().unwrap();
    assert_eq!(latest.id, t3);
    assert_eq!(latest.date, at(3, 6));
}

#[tokio::test]
async fn test_example_scenario() {
    let store = SleepStore::in_memory().await.unwrap();
    let jan = |day| Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();

    let a = store.insert(&SleepRecord::new(jan(1), 7.0)).await.unwrap();
    let b = store.insert(&SleepRecord::new(jan(3), 8.0)).await.unwrap();
    let c = store.insert(&SleepRecord::new(jan(2), 6.5)).await.unwrap();

    let mut all = store.get_all_sleep_data();
    let ids: Vec<_> = next_snapshot(&mut all).await.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![b, c, a]);

    let latest = store.get_latest_sleep_data().await.unwrap().unwrap();
    assert_eq!(latest.id, b);

    let mut from = store.get_sleep_data_from_date(jan(2));
    let ids: Vec<_> = next_snapshot(&mut from).await.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![b, c]);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn test_subscription_matches_direct_query_after_each_write() {
    let store = SleepStore::in_memory().await.unwrap();
    let mut live = store.get_all_sleep_data();
    assert!(next_snapshot(&mut live).await.is_empty());

    let id = store.insert(&session(1)).await.unwrap();
    assert_eq!(next_snapshot(&mut live).await, store.all_sleep_data().await.unwrap());

    store.insert(&session(2)).await.unwrap();
    assert_eq!(next_snapshot(&mut live).await, store.all_sleep_data().await.unwrap());

    store.delete_by_id(id).await.unwrap();
    assert_eq!(next_snapshot(&mut live).await, store.all_sleep_data().await.unwrap());

    store.delete_all().await.unwrap();
    assert!(next_snapshot(&mut live).await.is_empty());
}

#[tokio::test]
async fn test_repository_history_follows_saves() {
    let repo = SleepRepository::new(SleepStore::in_memory().await.unwrap());
    let mut history = repo.sleep_history();
    assert!(next_snapshot(&mut history).await.is_empty());

    let id = repo.save_sleep_data(&session(5)).await.unwrap();
    let snapshot = next_snapshot(&mut history).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);

    repo.delete_sleep_data(&snapshot[0]).await.unwrap();
    assert!(next_snapshot(&mut history).await.is_empty());
    assert!(repo.latest_sleep_data().await.unwrap().is_none());
}

// ============================================================================
// Failure semantics
// ============================================================================

#[tokio::test]
async fn test_cancelled_latest_read_leaks_nothing() {
    let store = SleepStore::in_memory().await.unwrap();
    store.insert(&session(1)).await.unwrap();

    for _ in 0..5 {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            store.get_latest_sleep_data_cancellable(&token).await,
            Err(Error::Cancelled)
        ));
    }

    let latest = tokio::time::timeout(Duration::from_secs(5), store.get_latest_sleep_data())
        .await
        .expect("pooled connection was not released")
        .unwrap();
    assert!(latest.is_some());
}

#[tokio::test]
async fn test_null_date_fails_instead_of_defaulting() {
    let store = SleepStore::in_memory().await.unwrap();
    sqlx::query(
        "INSERT INTO sleep_data (date, duration, quality, heartRate, stepCount, \
         deepSleepDuration, lightSleepDuration, remSleepDuration) \
         VALUES (NULL, 8.0, 90, 60, 0, 2.0, 4.0, 2.0)",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = store.get_latest_sleep_data().await.unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));
    assert!(!err.is_transient());

    let mut live = store.get_all_sleep_data();
    let item = tokio::time::timeout(Duration::from_secs(5), live.next())
        .await
        .unwrap()
        .unwrap();
    assert!(item.unwrap_err().is_corruption());
}

#[tokio::test]
async fn test_file_backed_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("sleep_database.db")).with_max_connections(2);

    let store = SleepStore::open(&config).await.unwrap();
    assert_eq!(store.db_path(), Some(config.db_path.as_path()));

    let id = store.insert(&session(7)).await.unwrap();
    let latest = store.get_latest_sleep_data().await.unwrap().unwrap();
    assert_eq!(latest, session(7).with_id(id));
    assert!(config.db_path.exists());
}
