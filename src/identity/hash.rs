//! 256-bit keyspace values.

use rand::Rng;
use std::cmp::Ordering;
use std::fmt;

use super::IdentityError;

/// Size of a hash code on the wire.
pub const HASH_SIZE: usize = 32;

/// A 256-bit value in the overlay keyspace.
///
/// Used for data keys, random-walk locations and trail identifiers. Ordering
/// is big-endian lexicographic, which matches numeric order on the ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HashCode([u8; HASH_SIZE]);

impl HashCode {
    /// The all-zero hash.
    pub const ZERO: HashCode = HashCode([0u8; HASH_SIZE]);

    /// Create a HashCode from a 32-byte array.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a HashCode from a slice.
    pub fn from_slice(slice: &[u8]) -> Result<Self, IdentityError> {
        let bytes: [u8; HASH_SIZE] = slice
            .try_into()
            .map_err(|_| IdentityError::InvalidHashLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Parse a HashCode from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    /// Generate a uniformly random HashCode.
    pub fn random() -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Clockwise distance from `self` to `other` on the 2^256 ring.
    ///
    /// Computed as `(other - self) mod 2^256`, returned as a HashCode so the
    /// result compares numerically.
    pub fn ring_distance(&self, other: &HashCode) -> HashCode {
        let mut out = [0u8; HASH_SIZE];
        let mut borrow = 0i16;
        for i in (0..HASH_SIZE).rev() {
            let mut d = other.0[i] as i16 - self.0[i] as i16 - borrow;
            if d < 0 {
                d += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = d as u8;
        }
        HashCode(out)
    }

    /// Compare two candidates by ring-successor distance from `self`.
    ///
    /// The candidate reached first walking clockwise from `self` sorts
    /// lower. `self` itself is at distance zero.
    pub fn cmp_successor(&self, a: &HashCode, b: &HashCode) -> Ordering {
        self.ring_distance(a).cmp(&self.ring_distance(b))
    }

    /// Short hex prefix for log output.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashCode({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_hex())
    }
}

impl AsRef<[u8]> for HashCode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
