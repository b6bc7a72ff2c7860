//! Tracker behavior against a live Redis server.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379 cargo test --features redis -- --ignored`.

#![cfg(feature = "redis")]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use timebits_engine::{BitStore, EventTracker, TrackerConfig};
use timebits_store::{RedisBitStore, RedisStoreConfig};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn store(namespace: &str) -> RedisBitStore {
    let config = RedisStoreConfig::with_url(redis_url())
        .namespace(namespace)
        .connection_timeout(Duration::from_secs(2));
    RedisBitStore::new(config).unwrap()
}

#[test]
fn test_silent_tracker_with_unreachable_server() {
    let config = RedisStoreConfig::with_url("redis://127.0.0.1:1234")
        .connection_timeout(Duration::from_millis(200));
    let store = RedisBitStore::new(config).unwrap();

    let silent = EventTracker::with_config(&store, TrackerConfig::builder().silent().build());
    silent.track("test", 1).unwrap();

    let loud = EventTracker::new(&store);
    assert!(loud.track("test", 1).unwrap_err().is_unavailable());
}

#[test]
#[ignore = "requires a running Redis server"]
fn test_redis_track_and_combine() {
    let store = store("timebits-test-combine");
    let tracker = EventTracker::new(&store);
    tracker.reset_all().unwrap();

    let now = Utc.with_ymd_and_hms(2026, 10, 21, 12, 0, 0).unwrap();
    let before = now - chrono::Duration::days(7);
    tracker.track_many_at("login", &[2, 12, 42], now).unwrap();
    tracker.track_at("login", 2, before).unwrap();

    let week = tracker.week("login", now).unwrap();
    let last_week = tracker.week("login", before).unwrap();

    assert_eq!(week.contains_all(&[12, 2, 1]).unwrap(), vec![true, true, false]);
    assert_eq!((&week & &last_week).unwrap().len().unwrap(), 1);
    assert_eq!((&week | &last_week).unwrap().len().unwrap(), 3);
    assert_eq!((&week - &last_week).unwrap().len().unwrap(), 2);
    assert!(!(!&week).unwrap().contains(2).unwrap());
    assert_eq!((&week & &[2, 12, 43]).unwrap(), [2, 12]);
    assert_eq!(tracker.events().unwrap(), vec!["login"]);

    tracker.reset_all().unwrap();
    assert!(tracker.keys().unwrap().is_empty());
}

#[test]
#[ignore = "requires a running Redis server"]
fn test_redis_namespaces_are_isolated() {
    let left = store("timebits-test-left");
    let right = store("timebits-test-right");
    left.set_bit("k", 1, true).unwrap();
    right.set_bit("k", 2, true).unwrap();

    assert!(left.get_bit("k", 1).unwrap());
    assert!(!left.get_bit("k", 2).unwrap());
    assert_eq!(left.list_keys("*").unwrap(), vec!["k"]);

    left.delete_keys(&["k".to_string()]).unwrap();
    right.delete_keys(&["k".to_string()]).unwrap();
    left.ping().unwrap();
}
