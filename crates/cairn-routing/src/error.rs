//! Errors returned by neighbor database operations.
//!
//! Every variant is an expected, recoverable condition. The calling routing
//! extension decides whether to retry, back off, or skip the neighbor.

use cairn_core::{BundleId, Eid};
use thiserror::Error;

use crate::dataset::DatasetKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NeighborError {
    /// No entry exists for this neighbor, or the entry was removed.
    #[error("entry for neighbor {0} not found")]
    NotFound(Eid),

    /// An authoritative summary vector was required but none is available.
    #[error("summary vector of {0} is not available")]
    FilterNotAvailable(Eid),

    /// The neighbor does not take part in summary vector exchange.
    #[error("neighbor {0} does not support summary vectors")]
    SummaryUnsupported(Eid),

    #[error("no more summary vector requests allowed")]
    NoMoreRequestsAvailable,

    #[error("no more transfer slots available")]
    NoSlotsAvailable,

    #[error("bundle {0} is already in transit")]
    AlreadyInTransit(BundleId),

    #[error("dataset {0:?} not available")]
    DatasetNotAvailable(DatasetKind),
}

pub type Result<T, E = NeighborError> = std::result::Result<T, E>;
