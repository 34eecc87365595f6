//! Trails
//!
//! A trail is this peer's view of one hop of a multi-hop path: who the
//! previous hop (predecessor) and next hop (successor) are, and the random
//! id each of those links is known by. A trail without a predecessor was
//! started here; a trail without a successor ends here.
//!
//! Trails are owned by the [`TrailRegistry`], which indexes them by id and by
//! expiration time.

mod registry;

pub use registry::TrailRegistry;

use crate::finger::FingerSlot;
use crate::{HashCode, PeerId};
use std::fmt;
use thiserror::Error;

/// Errors from trail registration.
#[derive(Debug, Error)]
pub enum TrailError {
    #[error("trail id already registered: {0}")]
    DuplicateId(HashCode),

    #[error("trail not found")]
    NotFound,
}

/// Opaque handle to a trail in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrailKey(u64);

impl TrailKey {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TrailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Which way along a trail a message travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Back toward where the trail started.
    TowardPredecessor,
    /// On toward where the trail ends.
    TowardSuccessor,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::TowardPredecessor => Direction::TowardSuccessor,
            Direction::TowardSuccessor => Direction::TowardPredecessor,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::TowardPredecessor => "predecessor",
            Direction::TowardSuccessor => "successor",
        };
        write!(f, "{}", name)
    }
}

/// One hop of a trail as seen by this peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trail {
    /// Id of the link to the predecessor.
    pub pred_id: Option<HashCode>,
    /// Id of the link to the successor.
    pub succ_id: Option<HashCode>,
    pub pred: Option<PeerId>,
    pub succ: Option<PeerId>,
    /// Absolute expiration in ms.
    pub expires_at_ms: u64,
    /// Finger slot backed by this trail, for locally started trails.
    pub finger: Option<FingerSlot>,
}

impl Trail {
    /// A trail started here toward `succ`.
    pub fn originated(succ: PeerId, succ_id: HashCode, expires_at_ms: u64) -> Self {
        Self {
            pred_id: None,
            succ_id: Some(succ_id),
            pred: None,
            succ: Some(succ),
            expires_at_ms,
            finger: None,
        }
    }

    /// A trail entering here from `pred`, with no successor yet.
    pub fn from_predecessor(pred: PeerId, pred_id: HashCode, expires_at_ms: u64) -> Self {
        Self {
            pred_id: Some(pred_id),
            succ_id: None,
            pred: Some(pred),
            succ: None,
            expires_at_ms,
            finger: None,
        }
    }

    /// Was this trail started by the local peer?
    pub fn is_local_origin(&self) -> bool {
        self.pred.is_none()
    }

    /// Does this trail end at the local peer?
    pub fn terminates_here(&self) -> bool {
        self.succ.is_none()
    }

    /// Next hop and link id in `direction`.
    pub fn hop(&self, direction: Direction) -> Option<(PeerId, HashCode)> {
        match direction {
            Direction::TowardPredecessor => self.pred.zip(self.pred_id),
            Direction::TowardSuccessor => self.succ.zip(self.succ_id),
        }
    }

    /// Side a message from `sender` arrived on, if `sender` is a neighbor on this trail.
    pub fn side_of(&self, sender: &PeerId) -> Option<Direction> {
        if self.pred.as_ref() == Some(sender) {
            Some(Direction::TowardPredecessor)
        } else if self.succ.as_ref() == Some(sender) {
            Some(Direction::TowardSuccessor)
        } else {
            None
        }
    }

    /// Does `sender` sit on the side of the trail identified by `id`?
    pub fn id_matches_side(&self, id: &HashCode, sender: &PeerId) -> Option<Direction> {
        if self.pred_id.as_ref() == Some(id) && self.pred.as_ref() == Some(sender) {
            Some(Direction::TowardPredecessor)
        } else if self.succ_id.as_ref() == Some(id) && self.succ.as_ref() == Some(sender) {
            Some(Direction::TowardSuccessor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests;
