//! Transfer slot accounting.
//!
//! Bounds the number of bundles concurrently in flight to one neighbor and
//! refuses a second concurrent transfer of the same bundle. Invariant:
//! `free + in_transit.len() == max` at every point outside the lock.

use std::collections::HashSet;

use cairn_core::{BundleId, Eid};
use parking_lot::Mutex;

use crate::error::{NeighborError, Result};

#[derive(Debug)]
struct Slots {
    in_transit: HashSet<BundleId>,
    free: usize,
}

#[derive(Debug)]
pub struct TransferSlots {
    owner: Eid,
    slots: Mutex<Slots>,
    max: usize,
    low_water: usize,
}

impl TransferSlots {
    pub fn new(owner: Eid, max: usize, low_water: usize) -> Self {
        Self {
            owner,
            slots: Mutex::new(Slots {
                in_transit: HashSet::new(),
                free: max,
            }),
            max,
            low_water: low_water.min(max),
        }
    }

    /// Claim a slot for `id`.
    ///
    /// The duplicate check runs before the capacity check so a retry of the
    /// same bundle is distinguishable from plain exhaustion.
    pub fn acquire(&self, id: &BundleId) -> Result<()> {
        let mut slots = self.slots.lock();
        if slots.in_transit.contains(id) {
            return Err(NeighborError::AlreadyInTransit(id.clone()));
        }
        if slots.free == 0 {
            return Err(NeighborError::NoSlotsAvailable);
        }
        slots.in_transit.insert(id.clone());
        slots.free -= 1;
        tracing::trace!(neighbor = %self.owner, bundle = %id, free = slots.free, "transfer slot acquired");
        Ok(())
    }

    /// Return the slot held by `id`. Releasing an id that is not in transit
    /// changes nothing.
    pub fn release(&self, id: &BundleId) {
        let mut slots = self.slots.lock();
        if slots.in_transit.remove(id) {
            slots.free = (slots.free + 1).min(self.max);
            tracing::trace!(neighbor = %self.owner, bundle = %id, free = slots.free, "transfer slot released");
        }
    }

    pub fn free(&self) -> usize {
        self.slots.lock().free
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn in_transit(&self) -> usize {
        self.slots.lock().in_transit.len()
    }

    pub fn is_in_transit(&self, id: &BundleId) -> bool {
        self.slots.lock().in_transit.contains(id)
    }

    pub fn is_threshold_reached(&self) -> bool {
        self.free() <= self.low_water
    }
}
