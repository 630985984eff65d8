//! cairn-core — shared DTN types: endpoint identifiers, bundle ids,
//! the summary-vector Bloom filter, clocks, and configuration.
//! All other Cairn crates depend on this one.

pub mod bloom;
pub mod bundle;
pub mod clock;
pub mod config;
pub mod eid;

pub use bloom::{BloomError, BloomFilter};
pub use bundle::{BundleId, Fragment, MetaBundle};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{CairnConfig, ConfigError, NeighborConfig};
pub use eid::{Eid, EidError};
