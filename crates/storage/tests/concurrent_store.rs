//! Concurrent access to the in-memory store.

use std::sync::Arc;
use std::thread;

use corelib::{NodeId, VersionVector};
use storage::{merged_version, MemoryStore, ReplicaStore, VersionedRecord};

#[test]
fn concurrent_writers_on_distinct_keys() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let node = NodeId::from(format!("writer{}", t));
                for i in 0..250 {
                    let mut version = VersionVector::new();
                    version.increment(&node);
                    let key = format!("t{}-k{}", t, i);
                    store
                        .put_versioned(&key, VersionedRecord::new(key.as_bytes().to_vec(), version))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 250);
    let held = store.get_versioned("t3-k17");
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].value, b"t3-k17");
}

#[test]
fn concurrent_writers_on_one_key_keep_newest() {
    let store = Arc::new(MemoryStore::new());
    let node = NodeId::from("a");

    let handles: Vec<_> = (1..=50u64)
        .map(|counter| {
            let store = Arc::clone(&store);
            let node = node.clone();
            thread::spawn(move || {
                let version: VersionVector = [(node, counter)].into_iter().collect();
                store
                    .put_versioned("hot", VersionedRecord::new(counter.to_string(), version))
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Whatever the interleaving, the causally newest write wins
    let held = store.get_versioned("hot");
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].version.get(&node), 50);
    assert_eq!(held[0].value, b"50");
}

#[test]
fn concurrent_updates_each_get_a_fresh_counter() {
    let store = Arc::new(MemoryStore::new());
    let node = NodeId::from("coordinator");

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            let node = node.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                for i in 0..50 {
                    let written = store
                        .update("hot", |held| {
                            let mut version = merged_version(held);
                            version.increment(&node);
                            VersionedRecord::new(format!("{}-{}", t, i), version)
                        })
                        .unwrap();
                    seen.push(written.version.get(&node));
                }
                seen
            })
        })
        .collect();

    let mut counters: Vec<u64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    counters.sort_unstable();
    counters.dedup();
    assert_eq!(counters.len(), 8 * 50);

    let held = store.get_versioned("hot");
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].version.get(&node), 400);
}

#[test]
fn concurrent_writers_from_different_nodes_become_siblings() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let version: VersionVector = [(format!("node{}", t), 1u64)].into_iter().collect();
                store
                    .put_versioned("k", VersionedRecord::new(format!("v{}", t), version))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_versioned("k").len(), 4);
}
