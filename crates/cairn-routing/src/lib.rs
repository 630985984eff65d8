//! cairn-routing — the neighbor database shared by routing extensions.
//!
//! Per neighbor it tracks what the neighbor already holds (summary vector
//! plus an exact fallback set), how many transfers are in flight to it, and
//! extension-specific datasets. A periodic sweep ages summary vectors.

pub mod database;
pub mod dataset;
pub mod entry;
pub mod error;
pub mod summary;
pub mod sweeper;
pub mod transfer;

pub use database::NeighborDatabase;
pub use dataset::{DatasetKind, DatasetStore, NeighborDataset};
pub use entry::{NeighborEntry, NeighborStats};
pub use error::NeighborError;
pub use summary::{FilterState, SummaryVector};
pub use sweeper::{expire_loop, spawn_expire_sweeper};
pub use transfer::TransferSlots;
