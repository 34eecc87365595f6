//! Local node identity.

use secp256k1::{Keypair, Secp256k1, SecretKey, XOnlyPublicKey};
use std::fmt;

use super::{IdentityError, PeerId};

/// The local peer's identity: a secp256k1 keypair and the derived PeerId.
pub struct Identity {
    keypair: Keypair,
    peer_id: PeerId,
}

impl Identity {
    /// Create a new random identity.
    pub fn generate() -> Self {
        loop {
            let mut secret_bytes = [0u8; 32];
            rand::Rng::fill(&mut rand::rng(), &mut secret_bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(secret_key) = SecretKey::from_slice(&secret_bytes) {
                return Self::from_secret_key(secret_key);
            }
        }
    }

    /// Create an identity from a secret key.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (pubkey, _parity) = keypair.x_only_public_key();
        Self {
            keypair,
            peer_id: PeerId::from_pubkey(&pubkey),
        }
    }

    /// Create an identity from secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, IdentityError> {
        let secret_key = SecretKey::from_slice(bytes)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Create an identity from a hex-encoded secret key.
    pub fn from_secret_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s.trim())?;
        let secret_key = SecretKey::from_slice(&bytes)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Hex encoding of the secret key, suitable for the config file.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.keypair.secret_bytes())
    }

    /// Return the x-only public key.
    pub fn pubkey(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    /// Return the peer identifier.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}
