//! Peer Identity and Keyspace Values
//!
//! Peers are identified by the SHA-256 hash of their secp256k1 x-only public
//! key. Keys in the overlay keyspace, trail identifiers and random-walk
//! locations are all 256-bit [`HashCode`] values.

mod hash;
mod local;
mod peer_id;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use hash::{HashCode, HASH_SIZE};
pub use local::Identity;
pub use peer_id::{PeerId, PEER_ID_SIZE};

/// Errors that can occur in identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(#[from] secp256k1::Error),

    #[error("invalid peer id length: expected 32, got {0}")]
    InvalidPeerIdLength(usize),

    #[error("invalid hash length: expected 32, got {0}")]
    InvalidHashLength(usize),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Compute SHA-256 hash of data.
fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests;
