//! 32-byte peer identifier derived from SHA-256(pubkey).

use secp256k1::XOnlyPublicKey;
use std::fmt;

use super::{sha256, IdentityError};

/// Size of a peer identifier on the wire.
pub const PEER_ID_SIZE: usize = 32;

/// 32-byte peer identifier: SHA-256 of the peer's x-only public key.
///
/// This is the identity carried in recorded trail paths and used as the key
/// of the friend table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId([u8; PEER_ID_SIZE]);

impl PeerId {
    /// Create a PeerId from a 32-byte array.
    pub fn from_bytes(bytes: [u8; PEER_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a PeerId from a slice.
    pub fn from_slice(slice: &[u8]) -> Result<Self, IdentityError> {
        let bytes: [u8; PEER_ID_SIZE] = slice
            .try_into()
            .map_err(|_| IdentityError::InvalidPeerIdLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Derive a PeerId from an x-only public key.
    pub fn from_pubkey(pubkey: &XOnlyPublicKey) -> Self {
        Self(sha256(&pubkey.serialize()))
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PEER_ID_SIZE] {
        &self.0
    }

    /// Short hex prefix for log output.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_hex())
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
