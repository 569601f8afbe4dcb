//! Contract: Delta Correctness
//!
//! Created hostnames get exactly one create; surviving hostnames with an
//! unchanged IP are left alone; hostnames that left the inventory get a
//! remote delete and leave the recorded map.

mod common;

use common::*;
use proxysync_core::state::MemoryStateStore;
use proxysync_core::traits::{PersistedState, StateStore};
use proxysync_core::{RunOutcome, SyncEngine};
use std::net::Ipv4Addr;

#[tokio::test]
async fn new_hostname_gets_a_create_and_survivors_are_untouched() {
    // previous = {a}, current = {a, b}, IP unchanged.
    let ip: Ipv4Addr = "1.1.1.1".parse().unwrap();
    let prior = PersistedState {
        hostnames: ["a.example.com".to_string()].into_iter().collect(),
        recorded_ips: [("a.example.com".to_string(), ip)].into_iter().collect(),
        last_public_ip: Some(ip),
    };

    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::with_state(prior);

    let engine = SyncEngine::new(
        Box::new(FixedInventory::new(&["a.example.com", "b.example.com"])),
        Box::new(FixedIpSource::new("1.1.1.1")),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        test_router(&["example.com"]),
        false,
    );

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Reconciled);

    // Exactly one create, for b only.
    assert_eq!(provider.applied(), vec![("b.example.com".to_string(), ip)]);
    assert!(provider.deleted().is_empty());

    // Final stored set is {a, b}; b now recorded at the current IP.
    let persisted = store.load().await.unwrap();
    assert_eq!(
        persisted.hostnames,
        ["a.example.com", "b.example.com"]
            .into_iter()
            .map(String::from)
            .collect()
    );
    assert_eq!(persisted.recorded_ips.get("b.example.com"), Some(&ip));
    assert_eq!(persisted.last_public_ip, Some(ip));
}

#[tokio::test]
async fn removed_hostname_is_deleted_and_forgotten() {
    // previous = {a, b}, current = {a}, IP unchanged.
    let ip: Ipv4Addr = "1.1.1.1".parse().unwrap();
    let prior = PersistedState {
        hostnames: ["a.example.com", "b.example.com"]
            .into_iter()
            .map(String::from)
            .collect(),
        recorded_ips: [
            ("a.example.com".to_string(), ip),
            ("b.example.com".to_string(), ip),
        ]
        .into_iter()
        .collect(),
        last_public_ip: Some(ip),
    };

    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::with_state(prior);

    let engine = SyncEngine::new(
        Box::new(FixedInventory::new(&["a.example.com"])),
        Box::new(FixedIpSource::new("1.1.1.1")),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        test_router(&["example.com"]),
        false,
    );

    engine.run_once().await.unwrap();

    // Surviving hostname untouched; departed one deleted remotely.
    assert!(provider.applied().is_empty());
    assert_eq!(provider.deleted(), vec!["b.example.com".to_string()]);

    let persisted = store.load().await.unwrap();
    assert!(!persisted.hostnames.contains("b.example.com"));
    assert!(!persisted.recorded_ips.contains_key("b.example.com"));
    assert!(persisted.recorded_ips.contains_key("a.example.com"));
}

#[tokio::test]
async fn hostname_missing_from_record_map_is_treated_as_fresh() {
    // A surviving hostname with no recorded IP (e.g., its create failed in
    // a past run) is re-applied even though the IP did not change.
    let ip: Ipv4Addr = "1.1.1.1".parse().unwrap();
    let prior = PersistedState {
        hostnames: ["a.example.com", "b.example.com"]
            .into_iter()
            .map(String::from)
            .collect(),
        // b is tracked but was never recorded as applied
        recorded_ips: [("a.example.com".to_string(), ip)].into_iter().collect(),
        last_public_ip: Some(ip),
    };

    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::with_state(prior);

    let engine = SyncEngine::new(
        Box::new(FixedInventory::new(&["a.example.com", "b.example.com", "c.example.com"])),
        Box::new(FixedIpSource::new("1.1.1.1")),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        test_router(&["example.com"]),
        false,
    );

    engine.run_once().await.unwrap();

    // c is created (new), b is self-healed (absent from the record map),
    // a is skipped.
    let mut applied = provider.applied_hosts();
    applied.sort();
    assert_eq!(applied, vec!["b.example.com", "c.example.com"]);
}
