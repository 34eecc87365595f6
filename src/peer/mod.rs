//! Friend Management
//!
//! A friend is a directly connected peer. Each friend carries the outbound
//! channel the transport drains, plus the keys of every trail that uses the
//! friend as predecessor or successor so that a disconnect can tear those
//! trails down without scanning the registry.

mod intern;

pub use intern::{PeerInterner, ShortPeerId};

use crate::trail::TrailKey;
use crate::PeerId;
use rand::seq::IteratorRandom;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::mpsc;

/// Outbound channel carrying encoded frames to one friend.
pub type PeerTx = mpsc::Sender<Vec<u8>>;
/// Receiving end of a friend's outbound channel, held by the transport.
pub type PeerRx = mpsc::Receiver<Vec<u8>>;

/// Create an outbound channel for a friend.
pub fn peer_channel(buffer: usize) -> (PeerTx, PeerRx) {
    mpsc::channel(buffer)
}

/// Errors related to friend operations.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer not connected: {0}")]
    NotConnected(PeerId),

    #[error("outbound channel full for {0}")]
    ChannelFull(PeerId),

    #[error("outbound channel closed for {0}")]
    ChannelClosed(PeerId),
}

/// A directly connected peer.
#[derive(Debug)]
pub struct Friend {
    id: PeerId,
    tx: PeerTx,
    /// Trails on which this friend is our predecessor.
    pub(crate) pred_trails: HashSet<TrailKey>,
    /// Trails on which this friend is our successor.
    pub(crate) succ_trails: HashSet<TrailKey>,
}

impl Friend {
    fn new(id: PeerId, tx: PeerTx) -> Self {
        Self {
            id,
            tx,
            pred_trails: HashSet::new(),
            succ_trails: HashSet::new(),
        }
    }

    /// The friend's identity.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Number of trails referencing this friend on either side.
    pub fn trail_count(&self) -> usize {
        self.pred_trails.len() + self.succ_trails.len()
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: Vec<u8>) -> Result<(), PeerError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PeerError::ChannelFull(self.id),
            mpsc::error::TrySendError::Closed(_) => PeerError::ChannelClosed(self.id),
        })
    }
}

/// The set of directly connected peers.
#[derive(Debug, Default)]
pub struct PeerTable {
    friends: HashMap<PeerId, Friend>,
}

impl PeerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a friend. Returns false if it was already present.
    pub fn insert(&mut self, id: PeerId, tx: PeerTx) -> bool {
        if self.friends.contains_key(&id) {
            return false;
        }
        self.friends.insert(id, Friend::new(id, tx));
        true
    }

    /// Remove a friend, returning its entry.
    pub fn remove(&mut self, id: &PeerId) -> Option<Friend> {
        self.friends.remove(id)
    }

    pub fn get(&self, id: &PeerId) -> Option<&Friend> {
        self.friends.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.friends.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.friends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
    }

    /// Iterate over the identities of all friends.
    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.friends.keys()
    }

    /// Pick a friend uniformly at random.
    pub fn pick_random(&self) -> Option<PeerId> {
        self.friends.keys().choose(&mut rand::rng()).copied()
    }

    /// Queue a frame for a friend without waiting.
    pub fn send(&self, id: &PeerId, frame: Vec<u8>) -> Result<(), PeerError> {
        match self.friends.get(id) {
            Some(friend) => friend.send(frame),
            None => Err(PeerError::NotConnected(*id)),
        }
    }

    /// Record that `key` uses `id` as its predecessor.
    pub(crate) fn link_predecessor(&mut self, id: &PeerId, key: TrailKey) -> bool {
        match self.friends.get_mut(id) {
            Some(friend) => friend.pred_trails.insert(key),
            None => false,
        }
    }

    /// Record that `key` uses `id` as its successor.
    pub(crate) fn link_successor(&mut self, id: &PeerId, key: TrailKey) -> bool {
        match self.friends.get_mut(id) {
            Some(friend) => friend.succ_trails.insert(key),
            None => false,
        }
    }

    pub(crate) fn unlink_predecessor(&mut self, id: &PeerId, key: TrailKey) -> bool {
        match self.friends.get_mut(id) {
            Some(friend) => friend.pred_trails.remove(&key),
            None => false,
        }
    }

    pub(crate) fn unlink_successor(&mut self, id: &PeerId, key: TrailKey) -> bool {
        match self.friends.get_mut(id) {
            Some(friend) => friend.succ_trails.remove(&key),
            None => false,
        }
    }
}
