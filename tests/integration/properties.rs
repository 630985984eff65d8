use cairn_core::{BloomFilter, NeighborConfig};
use cairn_routing::{FilterState, NeighborError};

use crate::*;

fn two_slots() -> NeighborConfig {
    NeighborConfig {
        max_transfer_slots: 2,
        transfer_low_water: 0,
        ..Default::default()
    }
}

#[test]
fn test_two_slot_walkthrough() {
    let (db, _) = database(two_slots(), 0);
    let entry = db.create_or_get(&neighbor(1));
    let (a, b, c) = (bundle(1), bundle(2), bundle(3));

    entry.acquire_transfer(&a).unwrap();
    assert_eq!(entry.free_slots(), 1);
    entry.acquire_transfer(&b).unwrap();
    assert_eq!(entry.free_slots(), 0);
    assert_eq!(entry.acquire_transfer(&c), Err(NeighborError::NoSlotsAvailable));

    entry.release_transfer(&a);
    assert_eq!(entry.free_slots(), 1);
    entry.acquire_transfer(&c).unwrap();
}

#[test]
fn test_second_acquire_is_already_in_transit() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));
    let a = bundle(1);
    entry.acquire_transfer(&a).unwrap();
    assert_eq!(entry.acquire_transfer(&a), Err(NeighborError::AlreadyInTransit(a.clone())));
    entry.release_transfer(&a);
    entry.acquire_transfer(&a).unwrap();
}

#[test]
fn test_filter_lifecycle_against_clock() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));

    entry.update(filter_of(&[5]), 10).unwrap();
    assert_eq!(entry.filter_state(), FilterState::Available);
    assert!(entry.has(&bundle(5), true).unwrap());

    entry.expire(9);
    assert_eq!(entry.filter_state(), FilterState::Available);

    entry.expire(10);
    assert_eq!(entry.filter_state(), FilterState::Expired);
    assert_eq!(
        entry.has(&bundle(5), true),
        Err(NeighborError::FilterNotAvailable(neighbor(1)))
    );
}

#[test]
fn test_reset_from_every_state() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));

    let drive: [fn(&cairn_routing::NeighborEntry); 4] = [
        |_| {},
        |e| e.update(filter_of(&[1]), 0).unwrap(),
        |e| {
            e.update(filter_of(&[1]), 5).unwrap();
            e.expire(100);
        },
        |e| e.finalize(),
    ];

    for setup in drive {
        entry.reset();
        entry.add(&meta(2, 10_000));
        setup(&entry);
        entry.reset();

        assert_eq!(entry.filter_state(), FilterState::Awaiting);
        assert_eq!(entry.stats().fallback_bundles, 0);
        for seq in 0..10 {
            assert_eq!(entry.has(&bundle(seq), false), Ok(false));
        }
    }
}

#[test]
fn test_fallback_covers_gap_between_snapshots() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));
    entry.update(filter_of(&[1, 2]), 100).unwrap();

    // Delivered after the snapshot was taken.
    entry.add(&meta(3, 10_000));
    for seq in [1, 2, 3] {
        assert!(entry.has(&bundle(seq), true).unwrap(), "missed bundle {seq}");
    }

    entry.expire(100);
    assert!(entry.has(&bundle(3), false).unwrap());
}

#[test]
fn test_dataset_replace_and_remove() {
    use cairn_routing::{DatasetKind, NeighborDataset};

    #[derive(Debug, PartialEq)]
    struct Hops(u32);
    impl NeighborDataset for Hops {
        const KIND: DatasetKind = DatasetKind::Custom(42);
    }

    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));
    entry.put_dataset(Hops(1));
    entry.put_dataset(Hops(2));
    assert_eq!(*entry.get_dataset::<Hops>().unwrap(), Hops(2));

    entry.remove_dataset(DatasetKind::Custom(42));
    assert_eq!(
        entry.get_dataset::<Hops>().unwrap_err(),
        NeighborError::DatasetNotAvailable(DatasetKind::Custom(42))
    );
}

#[test]
fn test_create_or_get_shares_state_and_remove_forgets() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let peer = neighbor(9);
    let one = db.create_or_get(&peer);
    let two = db.create_or_get(&peer);
    one.add(&meta(7, 10_000));
    assert!(two.has(&bundle(7), false).unwrap());

    db.remove(&peer);
    assert_eq!(db.get(&peer).unwrap_err(), NeighborError::NotFound(peer));
}

/// The bulk sweep leaves each entry exactly where its own expire would.
#[test]
fn test_bulk_expire_matches_per_entry_expire() {
    let lifetimes = [0u64, 3, 7, 10, 11, 25];
    let (swept, _) = database(NeighborConfig::default(), 0);
    let (direct, _) = database(NeighborConfig::default(), 0);

    for (i, lifetime) in lifetimes.iter().enumerate() {
        for db in [&swept, &direct] {
            let entry = db.create_or_get(&neighbor(i));
            entry.update(BloomFilter::new(), *lifetime).unwrap();
            entry.add(&meta(i as u64, *lifetime));
        }
    }
    // One entry never got a filter at all.
    swept.create_or_get(&neighbor(99));
    direct.create_or_get(&neighbor(99));

    for now in [5u64, 10, 1_011] {
        swept.expire(now);
        for eid in direct.neighbors() {
            direct.get(&eid).unwrap().expire(now);
        }
        assert_eq!(swept.snapshot(), direct.snapshot(), "diverged at {now}");
    }

    // Exported view after the last sweep, sorted by endpoint.
    let json = serde_json::to_value(swept.snapshot()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), lifetimes.len() + 1);
    assert_eq!(rows[0]["eid"], "dtn://node-0");
    assert_eq!(rows[0]["filter_state"], "available");
    assert!(rows[0]["filter_expires_at"].is_null());
    assert_eq!(rows[1]["filter_state"], "expired");
    assert_eq!(rows[1]["filter_expires_at"], 3);
    assert_eq!(rows[1]["fallback_bundles"], 0);
    assert_eq!(rows[6]["eid"], "dtn://node-99");
    assert_eq!(rows[6]["filter_state"], "awaiting");
}

#[test]
fn test_filter_requests_gated_until_reply() {
    let config = NeighborConfig {
        filter_request_budget: 2,
        filter_request_timeout_secs: 0,
        ..Default::default()
    };
    let (db, _) = database(config, 0);
    let entry = db.create_or_get(&neighbor(1));

    entry.acquire_filter_request().unwrap();
    entry.acquire_filter_request().unwrap();
    assert_eq!(
        entry.acquire_filter_request(),
        Err(NeighborError::NoMoreRequestsAvailable)
    );

    // No timeout configured: sweeps alone never refill.
    entry.expire(1_000_000);
    assert!(entry.acquire_filter_request().is_err());

    entry.update(filter_of(&[]), 30).unwrap();
    entry.acquire_filter_request().unwrap();
}

#[test]
fn test_final_neighbor_rejects_summary_exchange() {
    let (db, _) = database(NeighborConfig::default(), 0);
    let entry = db.create_or_get(&neighbor(1));
    entry.finalize();

    assert_eq!(
        entry.update(filter_of(&[1]), 10),
        Err(NeighborError::SummaryUnsupported(neighbor(1)))
    );
    assert_eq!(
        entry.acquire_filter_request(),
        Err(NeighborError::NoMoreRequestsAvailable)
    );
    // Transfers are unaffected.
    entry.acquire_transfer(&bundle(1)).unwrap();
}
