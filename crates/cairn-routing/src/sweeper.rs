//! Periodic expire sweep.
//!
//! Ticks every `expire_interval_secs` and runs the database's expire step
//! with the database clock's current time.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::database::NeighborDatabase;

/// Run expire sweeps forever. Cancel by aborting the task handle.
pub async fn expire_loop(db: Arc<NeighborDatabase>) {
    let period = Duration::from_secs(db.config().expire_interval_secs.max(1));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_secs = period.as_secs(), "neighbor expire sweep starting");

    loop {
        interval.tick().await;
        let now = db.clock().now();
        let expired = db.expire(now);
        if expired > 0 {
            tracing::debug!(now, expired, "summary vectors expired");
        }
    }
}

/// Spawn [`expire_loop`] on the current tokio runtime.
pub fn spawn_expire_sweeper(db: Arc<NeighborDatabase>) -> JoinHandle<()> {
    tokio::spawn(expire_loop(db))
}
