//! Neighbor entry — everything known about one neighbor.
//!
//! Three independently locked parts: the summary vector, the transfer slots
//! and the dataset store. A slow operation on one never blocks the others.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cairn_core::{BloomFilter, BundleId, Clock, Eid, MetaBundle, NeighborConfig, Timestamp};
use serde::Serialize;

use crate::dataset::{DatasetKind, DatasetStore, NeighborDataset};
use crate::error::{NeighborError, Result};
use crate::summary::{FilterState, SummaryVector};
use crate::transfer::TransferSlots;

/// Shared handle to a neighbor entry.
///
/// Do not hold a handle across a point where the neighbor may be removed.
/// A removed entry refuses new transfer and request acquisitions with
/// `NotFound`; re-acquire the handle from the database instead.
pub struct NeighborEntry {
    eid: Eid,
    clock: Arc<dyn Clock>,
    summary: SummaryVector,
    transfers: TransferSlots,
    datasets: DatasetStore,
    removed: AtomicBool,
}

/// Point-in-time view of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborStats {
    pub eid: Eid,
    pub filter_state: FilterState,
    pub filter_expires_at: Option<Timestamp>,
    pub filter_requests_left: u32,
    pub fallback_bundles: usize,
    pub in_transit: usize,
    pub free_slots: usize,
    pub max_slots: usize,
    pub datasets: Vec<DatasetKind>,
}

impl NeighborEntry {
    pub fn new(eid: Eid, config: &NeighborConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            summary: SummaryVector::new(
                eid.clone(),
                config.filter_request_budget,
                config.filter_request_timeout_secs,
            ),
            transfers: TransferSlots::new(
                eid.clone(),
                config.max_transfer_slots,
                config.transfer_low_water,
            ),
            datasets: DatasetStore::new(),
            removed: AtomicBool::new(false),
            clock,
            eid,
        }
    }

    pub fn eid(&self) -> &Eid {
        &self.eid
    }

    // ── Summary vector ────────────────────────────────────────────────────────

    /// Install a summary vector received from the neighbor.
    /// `lifetime` is in seconds from now; 0 means it never expires.
    pub fn update(&self, filter: BloomFilter, lifetime: u64) -> Result<()> {
        self.summary.update(filter, lifetime, self.clock.now())
    }

    /// Drop the snapshot and fallback set to force a fresh exchange.
    pub fn reset(&self) {
        self.summary.reset();
    }

    /// Record that the neighbor does not exchange summary vectors.
    pub fn finalize(&self) {
        self.summary.finalize();
    }

    /// Record that the neighbor is known to hold `meta`.
    pub fn add(&self, meta: &MetaBundle) {
        self.summary.add(meta);
    }

    /// Whether the neighbor (probably) holds `id`.
    ///
    /// With `require_filter` set this fails with `FilterNotAvailable` unless
    /// a fresh summary vector is installed.
    pub fn has(&self, id: &BundleId, require_filter: bool) -> Result<bool> {
        self.summary.has(id, require_filter)
    }

    pub fn acquire_filter_request(&self) -> Result<()> {
        self.ensure_present()?;
        self.summary.acquire_request(self.clock.now())
    }

    pub fn filter_state(&self) -> FilterState {
        self.summary.state()
    }

    pub fn filter_expires_at(&self) -> Option<Timestamp> {
        self.summary.expires_at()
    }

    // ── Transfers ─────────────────────────────────────────────────────────────

    pub fn acquire_transfer(&self, id: &BundleId) -> Result<()> {
        self.ensure_present()?;
        self.transfers.acquire(id)
    }

    pub fn release_transfer(&self, id: &BundleId) {
        self.transfers.release(id);
    }

    pub fn free_slots(&self) -> usize {
        self.transfers.free()
    }

    pub fn max_slots(&self) -> usize {
        self.transfers.max()
    }

    pub fn in_transit(&self) -> usize {
        self.transfers.in_transit()
    }

    pub fn is_in_transit(&self, id: &BundleId) -> bool {
        self.transfers.is_in_transit(id)
    }

    pub fn is_threshold_reached(&self) -> bool {
        self.transfers.is_threshold_reached()
    }

    // ── Datasets ──────────────────────────────────────────────────────────────

    pub fn get_dataset<T: NeighborDataset>(&self) -> Result<Arc<T>> {
        self.datasets.get::<T>()
    }

    pub fn put_dataset<T: NeighborDataset>(&self, payload: T) {
        tracing::trace!(neighbor = %self.eid, kind = ?T::KIND, "dataset stored");
        self.datasets.put(payload);
    }

    pub fn dataset_or_insert_with<T: NeighborDataset>(
        &self,
        init: impl FnOnce() -> T,
    ) -> Result<Arc<T>> {
        self.datasets.get_or_insert_with(init)
    }

    pub fn remove_dataset(&self, kind: DatasetKind) {
        self.datasets.remove(kind);
    }

    pub fn has_dataset(&self, kind: DatasetKind) -> bool {
        self.datasets.contains(kind)
    }

    /// Kinds currently attached, in `DatasetKind` order.
    pub fn dataset_kinds(&self) -> Vec<DatasetKind> {
        self.datasets.kinds()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Age the summary vector and prune the fallback set.
    /// Returns true if the summary vector expired during this call.
    pub fn expire(&self, now: Timestamp) -> bool {
        self.summary.expire(now)
    }

    /// True once the database has dropped this entry.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    pub fn stats(&self) -> NeighborStats {
        NeighborStats {
            eid: self.eid.clone(),
            filter_state: self.summary.state(),
            filter_expires_at: self.summary.expires_at(),
            filter_requests_left: self.summary.requests_left(),
            fallback_bundles: self.summary.fallback_len(),
            in_transit: self.transfers.in_transit(),
            free_slots: self.transfers.free(),
            max_slots: self.transfers.max(),
            datasets: self.dataset_kinds(),
        }
    }

    fn ensure_present(&self) -> Result<()> {
        if self.is_removed() {
            return Err(NeighborError::NotFound(self.eid.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NeighborEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborEntry")
            .field("eid", &self.eid)
            .field("filter_state", &self.summary.state())
            .field("free_slots", &self.transfers.free())
            .field("removed", &self.is_removed())
            .finish()
    }
}
