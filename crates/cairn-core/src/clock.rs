//! Time source for expiry decisions.
//!
//! Timestamps are DTN seconds: whole seconds since 2000-01-01T00:00:00Z.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the DTN epoch.
pub type Timestamp = u64;

/// Offset between the Unix epoch and the DTN epoch (2000-01-01).
pub const DTN_EPOCH_OFFSET: u64 = 946_684_800;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock. Reports 0 if the system clock sits before the DTN epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().saturating_sub(DTN_EPOCH_OFFSET))
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
