//! Summary vector state machine.
//!
//! States:
//!   Awaiting : no snapshot held (initial, and after reset)
//!   Available: snapshot installed and not yet stale
//!   Expired  : snapshot present but past its expiry
//!   Final    : neighbor does not exchange summary vectors
//!
//! Besides the Bloom filter snapshot, an exact fallback set records bundles
//! known delivered since the snapshot was taken. Fallback records carry the
//! bundle's own expiry and are pruned once the bundle is gone.
//!
//! Request budget: `acquire_request` spends one unit per summary vector
//! request. The budget refills on `update`, on `reset`, when an available
//! filter expires, and when an unanswered request times out.

use std::collections::HashMap;

use cairn_core::{BloomFilter, BundleId, Eid, MetaBundle, Timestamp};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{NeighborError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    Awaiting,
    Available,
    Expired,
    Final,
}

#[derive(Debug)]
struct Summary {
    state: FilterState,
    filter: BloomFilter,
    /// None = never expires. Kept through `Expired` so callers see when
    /// the snapshot went stale.
    expires_at: Option<Timestamp>,
    requests_left: u32,
    /// When the budget last ran dry, for request timeouts.
    exhausted_at: Option<Timestamp>,
    fallback: HashMap<BundleId, Timestamp>,
}

#[derive(Debug)]
pub struct SummaryVector {
    owner: Eid,
    inner: Mutex<Summary>,
    budget: u32,
    /// 0 = an unanswered request never times out.
    request_timeout: u64,
}

impl SummaryVector {
    pub fn new(owner: Eid, budget: u32, request_timeout: u64) -> Self {
        Self {
            owner,
            inner: Mutex::new(Summary {
                state: FilterState::Awaiting,
                filter: BloomFilter::new(),
                expires_at: None,
                requests_left: budget,
                exhausted_at: None,
                fallback: HashMap::new(),
            }),
            budget,
            request_timeout,
        }
    }

    /// Install a fresh snapshot valid for `lifetime` seconds from `now`.
    /// A lifetime of 0 means the snapshot never expires.
    pub fn update(&self, filter: BloomFilter, lifetime: u64, now: Timestamp) -> Result<()> {
        let mut s = self.inner.lock();
        if s.state == FilterState::Final {
            return Err(NeighborError::SummaryUnsupported(self.owner.clone()));
        }
        s.filter = filter;
        s.expires_at = (lifetime > 0).then(|| now.saturating_add(lifetime));
        s.state = FilterState::Available;
        self.refill(&mut s);
        tracing::debug!(neighbor = %self.owner, lifetime, "summary vector updated");
        Ok(())
    }

    pub fn reset(&self) {
        let mut s = self.inner.lock();
        s.state = FilterState::Awaiting;
        s.filter.clear();
        s.expires_at = None;
        s.fallback.clear();
        self.refill(&mut s);
        tracing::debug!(neighbor = %self.owner, "summary vector reset");
    }

    /// Mark the neighbor as not taking part in summary vector exchange.
    pub fn finalize(&self) {
        let mut s = self.inner.lock();
        s.state = FilterState::Final;
        s.filter.clear();
        s.expires_at = None;
        s.requests_left = 0;
        s.exhausted_at = None;
        tracing::debug!(neighbor = %self.owner, "summary vector exchange disabled");
    }

    /// Age the snapshot and prune dead fallback records.
    /// Returns true if this call moved the state to `Expired`.
    pub fn expire(&self, now: Timestamp) -> bool {
        let mut s = self.inner.lock();

        let mut expired = false;
        if s.state == FilterState::Available && s.expires_at.is_some_and(|at| now >= at) {
            s.state = FilterState::Expired;
            self.refill(&mut s);
            expired = true;
            tracing::debug!(neighbor = %self.owner, "summary vector expired");
        }

        if self.request_timeout > 0 && s.state != FilterState::Final {
            if let Some(since) = s.exhausted_at {
                if now >= since.saturating_add(self.request_timeout) {
                    self.refill(&mut s);
                    tracing::debug!(neighbor = %self.owner, "summary vector request timed out");
                }
            }
        }

        let before = s.fallback.len();
        s.fallback.retain(|_, expires_at| *expires_at >= now);
        let pruned = before - s.fallback.len();
        if pruned > 0 {
            tracing::trace!(neighbor = %self.owner, pruned, "fallback records pruned");
        }

        expired
    }

    pub fn acquire_request(&self, now: Timestamp) -> Result<()> {
        let mut s = self.inner.lock();
        if s.state == FilterState::Final || s.requests_left == 0 {
            return Err(NeighborError::NoMoreRequestsAvailable);
        }
        s.requests_left -= 1;
        if s.requests_left == 0 {
            s.exhausted_at = Some(now);
        }
        tracing::trace!(neighbor = %self.owner, left = s.requests_left, "summary vector request acquired");
        Ok(())
    }

    pub fn add(&self, meta: &MetaBundle) {
        let mut s = self.inner.lock();
        s.fallback.insert(meta.id.clone(), meta.expires_at);
    }

    pub fn has(&self, id: &BundleId, require_filter: bool) -> Result<bool> {
        let s = self.inner.lock();
        if s.state == FilterState::Available {
            if s.filter.contains(&id.key_bytes()) {
                return Ok(true);
            }
        } else if require_filter {
            return Err(NeighborError::FilterNotAvailable(self.owner.clone()));
        }
        Ok(s.fallback.contains_key(id))
    }

    pub fn state(&self) -> FilterState {
        self.inner.lock().state
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.inner.lock().expires_at
    }

    pub fn requests_left(&self) -> u32 {
        self.inner.lock().requests_left
    }

    pub fn fallback_len(&self) -> usize {
        self.inner.lock().fallback.len()
    }

    fn refill(&self, s: &mut Summary) {
        s.requests_left = self.budget;
        s.exhausted_at = None;
    }
}
