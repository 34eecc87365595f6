//! Trail storage indexed by id and by expiration.

use std::collections::{BTreeSet, HashMap};

use super::{Direction, Trail, TrailError, TrailKey};
use crate::HashCode;

/// Registry of all trails this peer participates in.
///
/// Each trail is reachable through at most one id per direction. Expiration
/// order is kept in an ordered set of `(expires_at_ms, key)` pairs, which
/// serves as the min-heap for the timeout sweep and supports removal of
/// arbitrary entries.
#[derive(Clone, Debug, Default)]
pub struct TrailRegistry {
    trails: HashMap<TrailKey, Trail>,
    by_id: HashMap<HashCode, TrailKey>,
    expiry: BTreeSet<(u64, TrailKey)>,
    next_key: u64,
}

impl TrailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a trail, indexing every id it carries.
    ///
    /// Fails without side effects if any of its ids is already taken.
    pub fn register(&mut self, trail: Trail) -> Result<TrailKey, TrailError> {
        for id in trail.pred_id.iter().chain(trail.succ_id.iter()) {
            if self.by_id.contains_key(id) {
                return Err(TrailError::DuplicateId(*id));
            }
        }
        if let (Some(pred_id), Some(succ_id)) = (trail.pred_id, trail.succ_id)
            && pred_id == succ_id
        {
            return Err(TrailError::DuplicateId(pred_id));
        }

        let key = TrailKey(self.next_key);
        self.next_key += 1;

        for id in trail.pred_id.iter().chain(trail.succ_id.iter()) {
            self.by_id.insert(*id, key);
        }
        self.expiry.insert((trail.expires_at_ms, key));
        self.trails.insert(key, trail);
        Ok(key)
    }

    /// Index a new id for one side of an existing trail.
    ///
    /// Replaces nothing: fails if the id is taken or that side already has
    /// an id.
    pub fn register_id(
        &mut self,
        key: TrailKey,
        side: Direction,
        id: HashCode,
    ) -> Result<(), TrailError> {
        if self.by_id.contains_key(&id) {
            return Err(TrailError::DuplicateId(id));
        }
        let trail = self.trails.get_mut(&key).ok_or(TrailError::NotFound)?;
        let slot = match side {
            Direction::TowardPredecessor => &mut trail.pred_id,
            Direction::TowardSuccessor => &mut trail.succ_id,
        };
        if let Some(existing) = slot {
            return Err(TrailError::DuplicateId(*existing));
        }
        *slot = Some(id);
        self.by_id.insert(id, key);
        Ok(())
    }

    /// Find the trail registered under `id`.
    pub fn lookup(&self, id: &HashCode) -> Option<TrailKey> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, key: TrailKey) -> Option<&Trail> {
        self.trails.get(&key)
    }

    pub(crate) fn get_mut(&mut self, key: TrailKey) -> Option<&mut Trail> {
        self.trails.get_mut(&key)
    }

    pub fn contains(&self, key: TrailKey) -> bool {
        self.trails.contains_key(&key)
    }

    /// Remove a trail and all of its index entries.
    pub fn remove(&mut self, key: TrailKey) -> Option<Trail> {
        let trail = self.trails.remove(&key)?;
        for id in trail.pred_id.iter().chain(trail.succ_id.iter()) {
            if self.by_id.get(id) == Some(&key) {
                self.by_id.remove(id);
            }
        }
        self.expiry.remove(&(trail.expires_at_ms, key));
        Some(trail)
    }

    /// Earliest trail whose expiration is at or before `now_ms`.
    pub fn first_expired(&self, now_ms: u64) -> Option<TrailKey> {
        self.expiry
            .first()
            .filter(|(expires_at, _)| *expires_at <= now_ms)
            .map(|(_, key)| *key)
    }

    /// Earliest expiration of any trail.
    pub fn next_expiry(&self) -> Option<u64> {
        self.expiry.first().map(|(expires_at, _)| *expires_at)
    }

    /// Iterate over all trails.
    pub fn iter(&self) -> impl Iterator<Item = (TrailKey, &Trail)> {
        self.trails.iter().map(|(k, t)| (*k, t))
    }

    /// All trail keys, in no particular order.
    pub fn keys(&self) -> Vec<TrailKey> {
        self.trails.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Number of ids indexed.
    pub fn id_count(&self) -> usize {
        self.by_id.len()
    }
}
