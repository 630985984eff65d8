//! Neighbor database — tracks every neighbor routing extensions talk to.
//!
//! Map locks are held only for the map operation itself. Callers get an
//! `Arc<NeighborEntry>` and do all further work on the entry's own locks,
//! so traffic for one neighbor never contends with another.

use std::sync::Arc;

use cairn_core::{Clock, Eid, NeighborConfig, SystemClock, Timestamp};
use dashmap::DashMap;

use crate::entry::{NeighborEntry, NeighborStats};
use crate::error::{NeighborError, Result};

pub struct NeighborDatabase {
    entries: DashMap<Eid, Arc<NeighborEntry>>,
    config: NeighborConfig,
    clock: Arc<dyn Clock>,
}

impl Default for NeighborDatabase {
    fn default() -> Self {
        Self::new(NeighborConfig::default())
    }
}

impl NeighborDatabase {
    pub fn new(config: NeighborConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: NeighborConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &NeighborConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Look up an existing neighbor.
    pub fn get(&self, eid: &Eid) -> Result<Arc<NeighborEntry>> {
        self.entries
            .get(eid)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NeighborError::NotFound(eid.clone()))
    }

    /// Look up a neighbor, creating an empty entry if it is unknown.
    ///
    /// Lookup and insert happen under one shard lock, so concurrent callers
    /// for the same neighbor always end up with the same entry.
    pub fn create_or_get(&self, eid: &Eid) -> Arc<NeighborEntry> {
        if let Some(entry) = self.entries.get(eid) {
            return Arc::clone(entry.value());
        }
        let entry = self.entries.entry(eid.clone()).or_insert_with(|| {
            tracing::info!(neighbor = %eid, "neighbor entry created");
            Arc::new(NeighborEntry::new(eid.clone(), &self.config, self.clock()))
        });
        Arc::clone(entry.value())
    }

    /// Drop a neighbor. Unknown neighbors are ignored.
    ///
    /// Handles still held elsewhere stay readable but refuse new transfer
    /// and summary vector request acquisitions.
    pub fn remove(&self, eid: &Eid) {
        if let Some((_, entry)) = self.entries.remove(eid) {
            entry.mark_removed();
            tracing::info!(neighbor = %eid, in_transit = entry.in_transit(), "neighbor entry removed");
        }
    }

    /// Run every entry's expire step. Returns how many summary vectors
    /// expired during the sweep.
    pub fn expire(&self, now: Timestamp) -> usize {
        // Snapshot the handles first so no shard lock is held while expiring.
        let entries: Vec<Arc<NeighborEntry>> = self
            .entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let expired = entries.iter().filter(|entry| entry.expire(now)).count();
        tracing::debug!(now, neighbors = entries.len(), expired, "expire sweep finished");
        expired
    }

    pub fn contains(&self, eid: &Eid) -> bool {
        self.entries.contains_key(eid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known neighbors, sorted.
    pub fn neighbors(&self) -> Vec<Eid> {
        let mut eids: Vec<Eid> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        eids.sort();
        eids
    }

    /// Stats for every neighbor, sorted by identity.
    pub fn snapshot(&self) -> Vec<NeighborStats> {
        let entries: Vec<Arc<NeighborEntry>> = self
            .entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut stats: Vec<NeighborStats> = entries.iter().map(|entry| entry.stats()).collect();
        stats.sort_by(|a, b| a.eid.cmp(&b.eid));
        stats
    }
}

impl std::fmt::Debug for NeighborDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborDatabase")
            .field("neighbors", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}
