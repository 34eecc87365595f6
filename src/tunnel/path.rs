//! Explicit peer paths used to build tunnel trees.

use std::fmt;

use super::PathError;
use crate::peer::{PeerInterner, ShortPeerId};
use crate::PeerId;

/// An ordered list of peers from an origin to a destination.
///
/// Never empty, and never lists the same peer twice in a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerPath {
    peers: Vec<ShortPeerId>,
}

impl PeerPath {
    /// Create a path, rejecting empty paths and consecutive repeats.
    pub fn new(peers: Vec<ShortPeerId>) -> Result<Self, PathError> {
        if peers.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(pair) = peers.windows(2).find(|w| w[0] == w[1]) {
            return Err(PathError::RepeatedHop(pair[0]));
        }
        Ok(Self { peers })
    }

    /// Build a path from full peer identities, interning each one.
    pub fn intern(peers: &[PeerId], interner: &mut PeerInterner) -> Result<Self, PathError> {
        Self::new(peers.iter().map(|p| interner.intern(p)).collect())
    }

    /// Reverse the path in place.
    pub fn invert(&mut self) {
        self.peers.reverse();
    }

    /// Number of peers, origin and destination included.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peers(&self) -> &[ShortPeerId] {
        &self.peers
    }

    /// Hops from `local` to the destination.
    ///
    /// `u32::MAX` when `local` is not on the path.
    pub fn hops_from(&self, local: ShortPeerId) -> u32 {
        match self.peers.iter().position(|&p| p == local) {
            Some(pos) => (self.peers.len() - 1 - pos) as u32,
            None => u32::MAX,
        }
    }

    pub fn origin(&self) -> ShortPeerId {
        self.peers[0]
    }

    pub fn destination(&self) -> ShortPeerId {
        self.peers[self.peers.len() - 1]
    }
}

impl fmt::Display for PeerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, peer) in self.peers.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", peer)?;
        }
        Ok(())
    }
}
