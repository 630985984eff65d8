use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::{anyhow, Result};
use cairn_core::NeighborConfig;
use cairn_routing::NeighborError;

use crate::*;

const THREADS: usize = 8;

/// Concurrent create_or_get for the same neighbor must converge on one entry.
#[test]
fn test_concurrent_create_converges() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let barrier = Arc::new(Barrier::new(THREADS));
    let peer = neighbor(1);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = db.clone();
            let barrier = barrier.clone();
            let peer = peer.clone();
            thread::spawn(move || {
                barrier.wait();
                db.create_or_get(&peer)
            })
        })
        .collect();

    let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for entry in &entries[1..] {
        assert!(Arc::ptr_eq(&entries[0], entry), "threads saw different entries");
    }
    assert_eq!(db.len(), 1);
}

/// Racing threads never hand out more slots than configured, and every
/// won slot belongs to a distinct bundle.
#[test]
fn test_concurrent_acquire_respects_capacity() -> Result<()> {
    let config = NeighborConfig {
        max_transfer_slots: 3,
        transfer_low_water: 1,
        ..Default::default()
    };
    let (db, _) = database(config, 0);
    let entry = db.create_or_get(&neighbor(1));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u64)
        .map(|seq| {
            let entry = entry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                // Two threads share each bundle to force duplicate races.
                let id = bundle(seq / 2);
                entry.acquire_transfer(&id).map(|_| id)
            })
        })
        .collect();

    let mut won = HashSet::new();
    for handle in handles {
        match handle.join().map_err(|_| anyhow!("worker panicked"))? {
            Ok(id) => assert!(won.insert(id), "bundle acquired twice"),
            Err(NeighborError::NoSlotsAvailable) | Err(NeighborError::AlreadyInTransit(_)) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(won.len(), 3);
    assert_eq!(entry.free_slots(), 0);
    assert!(entry.is_threshold_reached());
    Ok(())
}

/// Acquire/release churn from many threads leaves the counters balanced.
#[test]
fn test_acquire_release_churn_balances() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));
    let max = entry.max_slots();

    let handles: Vec<_> = (0..THREADS as u64)
        .map(|t| {
            let entry = entry.clone();
            thread::spawn(move || {
                for round in 0..500u64 {
                    let id = bundle(t * 1_000 + round % 7);
                    if entry.acquire_transfer(&id).is_ok() {
                        assert!(entry.free_slots() < entry.max_slots());
                        entry.release_transfer(&id);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(entry.free_slots(), max);
    assert_eq!(entry.in_transit(), 0);
}

/// Work on one neighbor proceeds while another neighbor is being
/// created, swept and removed over and over.
#[test]
fn test_independent_neighbors_under_churn() {
    let (db, clock) = database(NeighborConfig::default(), 0);
    let stable = db.create_or_get(&neighbor(0));
    stable.update(filter_of(&[1, 2, 3]), 0).unwrap();

    let churn = {
        let db = db.clone();
        thread::spawn(move || {
            for i in 1..200 {
                let entry = db.create_or_get(&neighbor(i % 10 + 1));
                let _ = entry.acquire_transfer(&bundle(i as u64));
                db.expire(i as u64);
                db.remove(&neighbor(i % 10 + 1));
            }
        })
    };

    for seq in 0..200u64 {
        let id = bundle(seq);
        stable.acquire_transfer(&id).unwrap();
        assert!(stable.has(&bundle(1), true).unwrap());
        stable.release_transfer(&id);
        clock.advance(1);
    }

    churn.join().unwrap();
    assert!(db.contains(&neighbor(0)));
    assert_eq!(stable.free_slots(), stable.max_slots());
    assert!(db.len() <= 11);
}

/// A handle kept across removal stops granting slots; the caller must go
/// back to the database.
#[test]
fn test_handle_retained_across_removal() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let peer = neighbor(3);
    let stale = db.create_or_get(&peer);
    stale.acquire_transfer(&bundle(1)).unwrap();

    db.remove(&peer);
    assert_eq!(
        stale.acquire_transfer(&bundle(2)),
        Err(NeighborError::NotFound(peer.clone()))
    );
    assert_eq!(
        stale.acquire_filter_request(),
        Err(NeighborError::NotFound(peer.clone()))
    );
    stale.release_transfer(&bundle(1));

    let fresh = db.create_or_get(&peer);
    fresh.acquire_transfer(&bundle(2)).unwrap();
    assert_eq!(fresh.free_slots(), fresh.max_slots() - 1);
}
