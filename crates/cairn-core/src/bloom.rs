//! Bloom filter used as the summary vector.
//!
//! A neighbor advertises the bundles it holds as a Bloom filter. Membership
//! tests can return false positives but never false negatives.
//!
//! Bit indexes come from BLAKE3 double hashing: the first 16 bytes of the
//! digest give two 64-bit bases h1 and h2, and probe i is
//! `(h1 + i * h2) mod num_bits`.
//!
//! Serialized form (what goes on the wire inside a summary vector):
//!   byte 0       hash count k
//!   bytes 1..    packed bit array, LSB first

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default filter size in bytes.
pub const DEFAULT_FILTER_SIZE_BYTES: usize = 512;

/// Default number of probes per element.
pub const DEFAULT_HASH_COUNT: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BloomError {
    #[error("filter must hold at least one byte")]
    Empty,
    #[error("hash count must be positive")]
    ZeroHashCount,
    #[error("serialized filter truncated")]
    Truncated,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBloom")]
pub struct BloomFilter {
    bits: Vec<u8>,
    hash_count: u8,
}

/// Unchecked serde shape; goes through the same checks as `with_params`.
#[derive(Deserialize)]
struct RawBloom {
    bits: Vec<u8>,
    hash_count: u8,
}

impl TryFrom<RawBloom> for BloomFilter {
    type Error = BloomError;

    fn try_from(raw: RawBloom) -> Result<Self, Self::Error> {
        Self::checked(raw.bits, raw.hash_count)
    }
}

impl BloomFilter {
    pub fn new() -> Self {
        Self {
            bits: vec![0u8; DEFAULT_FILTER_SIZE_BYTES],
            hash_count: DEFAULT_HASH_COUNT,
        }
    }

    pub fn with_params(size_bytes: usize, hash_count: u8) -> Result<Self, BloomError> {
        Self::checked(vec![0u8; size_bytes], hash_count)
    }

    fn checked(bits: Vec<u8>, hash_count: u8) -> Result<Self, BloomError> {
        if hash_count == 0 {
            return Err(BloomError::ZeroHashCount);
        }
        if bits.is_empty() {
            return Err(BloomError::Empty);
        }
        Ok(Self { bits, hash_count })
    }

    pub fn insert(&mut self, data: &[u8]) {
        let (h1, h2) = base_hashes(data);
        for i in 0..self.hash_count {
            let idx = self.probe(h1, h2, i);
            self.bits[idx / 8] |= 1 << (idx % 8);
        }
    }

    /// True if `data` may be in the set; false means definitely absent.
    pub fn contains(&self, data: &[u8]) -> bool {
        let (h1, h2) = base_hashes(data);
        (0..self.hash_count).all(|i| {
            let idx = self.probe(h1, h2, i);
            self.bits[idx / 8] & (1 << (idx % 8)) != 0
        })
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len() * 8
    }

    pub fn hash_count(&self) -> u8 {
        self.hash_count
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.bits.len());
        buf.put_u8(self.hash_count);
        buf.put_slice(&self.bits);
        buf.freeze()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, BloomError> {
        let (&hash_count, bits) = data.split_first().ok_or(BloomError::Truncated)?;
        Self::checked(bits.to_vec(), hash_count)
    }

    fn probe(&self, h1: u64, h2: u64, i: u8) -> usize {
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.num_bits() as u64) as usize
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits())
            .field("hash_count", &self.hash_count)
            .field("ones", &self.count_ones())
            .finish()
    }
}

fn base_hashes(data: &[u8]) -> (u64, u64) {
    let digest = blake3::hash(data);
    let bytes = digest.as_bytes();
    let mut a = [0u8; 8];
    let mut b = [0u8; 8];
    a.copy_from_slice(&bytes[..8]);
    b.copy_from_slice(&bytes[8..16]);
    // An even h2 would revisit the same bits in power-of-two filters.
    (u64::from_le_bytes(a), u64::from_le_bytes(b) | 1)
}
