//! Per-neighbor extension datasets.
//!
//! Routing extensions attach their own typed state to a neighbor entry
//! without the database knowing those types. Each payload type declares the
//! kind it is stored under; a kind holds at most one payload, and retrieval
//! checks the concrete type.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{NeighborError, Result};

/// Tag identifying which extension a dataset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Epidemic,
    Prophet,
    Flooding,
    SprayAndWait,
    /// Out-of-tree extensions pick their own number.
    Custom(u16),
}

/// Extension state that can be attached to a neighbor entry.
///
/// Payloads are shared as `Arc<Self>`; types that change after insertion
/// carry their own interior locking.
pub trait NeighborDataset: Any + Send + Sync {
    const KIND: DatasetKind;
}

type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct DatasetStore {
    sets: RwLock<HashMap<DatasetKind, Payload>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: NeighborDataset>(&self) -> Result<Arc<T>> {
        let payload = self
            .sets
            .read()
            .get(&T::KIND)
            .cloned()
            .ok_or(NeighborError::DatasetNotAvailable(T::KIND))?;
        payload
            .downcast::<T>()
            .map_err(|_| NeighborError::DatasetNotAvailable(T::KIND))
    }

    /// Store `payload` under its kind, replacing any previous payload.
    pub fn put<T: NeighborDataset>(&self, payload: T) {
        self.sets.write().insert(T::KIND, Arc::new(payload));
    }

    /// Fetch the payload for `T`, inserting `init()` if the kind is empty.
    ///
    /// Fails only if the kind is occupied by a different concrete type.
    pub fn get_or_insert_with<T: NeighborDataset>(&self, init: impl FnOnce() -> T) -> Result<Arc<T>> {
        let mut sets = self.sets.write();
        let payload = sets
            .entry(T::KIND)
            .or_insert_with(|| Arc::new(init()) as Payload)
            .clone();
        payload
            .downcast::<T>()
            .map_err(|_| NeighborError::DatasetNotAvailable(T::KIND))
    }

    pub fn remove(&self, kind: DatasetKind) {
        self.sets.write().remove(&kind);
    }

    pub fn contains(&self, kind: DatasetKind) -> bool {
        self.sets.read().contains_key(&kind)
    }

    /// Kinds currently held, sorted.
    pub fn kinds(&self) -> Vec<DatasetKind> {
        let mut kinds: Vec<DatasetKind> = self.sets.read().keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetStore")
            .field("kinds", &self.kinds())
            .finish()
    }
}
