//! Bundle identity and summary metadata.
//!
//! A bundle is identified by its source endpoint, creation timestamp and
//! sequence number. Fragments of the same bundle additionally carry their
//! offset and the payload length, so each fragment is a distinct id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::eid::Eid;

/// Fragment position within the original payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fragment {
    pub offset: u64,
    pub payload_length: u64,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleId {
    pub source: Eid,
    pub timestamp: Timestamp,
    pub sequence: u64,
    pub fragment: Option<Fragment>,
}

impl BundleId {
    pub fn new(source: Eid, timestamp: Timestamp, sequence: u64) -> Self {
        Self {
            source,
            timestamp,
            sequence,
            fragment: None,
        }
    }

    pub fn fragment(mut self, offset: u64, payload_length: u64) -> Self {
        self.fragment = Some(Fragment {
            offset,
            payload_length,
        });
        self
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }

    /// Canonical byte key. Both ends of a summary vector exchange must
    /// derive the same key for the same bundle, so the layout is fixed:
    ///
    ///   source bytes || 0x00 || timestamp (BE u64) || sequence (BE u64)
    ///   [ || offset (BE u64) || payload_length (BE u64) ]
    pub fn key_bytes(&self) -> Vec<u8> {
        let source = self.source.as_bytes();
        let mut key = Vec::with_capacity(source.len() + 1 + 32);
        key.extend_from_slice(source);
        key.push(0);
        key.extend_from_slice(&self.timestamp.to_be_bytes());
        key.extend_from_slice(&self.sequence.to_be_bytes());
        if let Some(frag) = &self.fragment {
            key.extend_from_slice(&frag.offset.to_be_bytes());
            key.extend_from_slice(&frag.payload_length.to_be_bytes());
        }
        key
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}.{}] {}", self.timestamp, self.sequence, self.source)?;
        if let Some(frag) = &self.fragment {
            write!(f, " #{}:{}", frag.offset, frag.payload_length)?;
        }
        Ok(())
    }
}

impl fmt::Debug for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BundleId({self})")
    }
}

/// Summary of a stored bundle: enough to route it without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaBundle {
    pub id: BundleId,
    pub destination: Eid,
    /// Lifetime in seconds, relative to the creation timestamp.
    pub lifetime: u64,
    /// Absolute expiry in DTN seconds.
    pub expires_at: Timestamp,
}

impl MetaBundle {
    pub fn new(id: BundleId, destination: Eid, lifetime: u64) -> Self {
        let expires_at = id.timestamp.saturating_add(lifetime);
        Self {
            id,
            destination,
            lifetime,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }
}
