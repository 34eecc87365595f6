//! Peer identity interning.
//!
//! The tunnel tree stores peers as compact [`ShortPeerId`] handles instead
//! of full 32-byte identities. Entries are reference counted: every
//! `intern` takes a reference and every `release` drops one, and the entry
//! goes away with its last reference. Handles are never reused, so a handle
//! whose entry went away simply stops resolving.

use crate::PeerId;
use std::collections::HashMap;
use std::fmt;

/// Compact handle for an interned peer identity. Zero is never issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortPeerId(u32);

impl ShortPeerId {
    /// Create from raw u32.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw u32 value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShortPeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Entry {
    peer: PeerId,
    refs: u32,
}

/// Reference-counted bidirectional map between PeerIds and ShortPeerIds.
#[derive(Debug)]
pub struct PeerInterner {
    by_peer: HashMap<PeerId, ShortPeerId>,
    by_short: HashMap<ShortPeerId, Entry>,
    next: u32,
}

impl PeerInterner {
    pub fn new() -> Self {
        Self {
            by_peer: HashMap::new(),
            by_short: HashMap::new(),
            next: 1,
        }
    }

    /// Take a reference to the handle for `peer`, issuing one if needed.
    pub fn intern(&mut self, peer: &PeerId) -> ShortPeerId {
        if let Some(&short) = self.by_peer.get(peer)
            && let Some(entry) = self.by_short.get_mut(&short)
        {
            entry.refs += 1;
            return short;
        }
        let short = ShortPeerId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        self.by_peer.insert(*peer, short);
        self.by_short.insert(short, Entry { peer: *peer, refs: 1 });
        short
    }

    /// Handle for `peer`, if interned.
    pub fn lookup(&self, peer: &PeerId) -> Option<ShortPeerId> {
        self.by_peer.get(peer).copied()
    }

    /// Identity behind a handle, if still valid.
    pub fn resolve(&self, short: ShortPeerId) -> Option<PeerId> {
        self.by_short.get(&short).map(|e| e.peer)
    }

    /// Number of references held on `short`.
    pub fn refs(&self, short: ShortPeerId) -> u32 {
        self.by_short.get(&short).map_or(0, |e| e.refs)
    }

    /// Drop one reference to `short`, removing the mapping with the last.
    ///
    /// Returns the peer whose mapping was removed.
    pub fn release(&mut self, short: ShortPeerId) -> Option<PeerId> {
        let entry = self.by_short.get_mut(&short)?;
        entry.refs -= 1;
        if entry.refs > 0 {
            return None;
        }
        let peer = entry.peer;
        self.by_short.remove(&short);
        self.by_peer.remove(&peer);
        Some(peer)
    }

    pub fn len(&self) -> usize {
        self.by_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_short.is_empty()
    }
}

impl Default for PeerInterner {
    fn default() -> Self {
        Self::new()
    }
}
