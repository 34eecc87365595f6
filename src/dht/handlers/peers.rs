//! Friend connect and disconnect.

use crate::dht::RoutingContext;
use crate::peer::PeerTx;
use crate::PeerId;
use std::collections::HashSet;
use tracing::{debug, info};

impl RoutingContext {
    /// Add a directly connected friend.
    ///
    /// The first friend wakes the random-walk engine immediately. Returns
    /// false if the peer is ourselves or already a friend.
    pub fn peer_connected(&mut self, peer: PeerId, tx: PeerTx, now_ms: u64) -> bool {
        if peer == self.my_id {
            debug!("Ignoring connect notification for self");
            return false;
        }
        if !self.peers.insert(peer, tx) {
            debug!(peer = %peer, "Friend already connected");
            return false;
        }
        // Held until the friend disconnects
        self.interner.intern(&peer);

        info!(peer = %peer, friends = self.peers.len(), "Friend connected");

        if self.peers.len() == 1 {
            self.random_walk_due_ms = Some(now_ms);
        }
        true
    }

    /// Remove a friend and every trail that runs through it.
    ///
    /// Trails using the friend as successor are deleted notifying only the
    /// predecessor, and vice versa, so each surviving neighbor hears about
    /// it exactly once. Losing the last friend cancels the pending walk.
    pub fn peer_disconnected(&mut self, peer: &PeerId) -> bool {
        let Some(friend) = self.peers.remove(peer) else {
            debug!(peer = %peer, "Disconnect for unknown friend");
            return false;
        };
        self.release_short_id(peer);

        let keys: HashSet<_> = friend
            .succ_trails
            .iter()
            .chain(friend.pred_trails.iter())
            .copied()
            .collect();
        let trail_count = keys.len();

        for key in keys {
            let Some(trail) = self.trails.get(key) else {
                self.invariant_violation("friend lists a trail missing from the registry");
                continue;
            };
            let notify_pred = trail.pred.is_some_and(|p| p != *peer);
            let notify_succ = trail.succ.is_some_and(|p| p != *peer);
            self.delete_trail(key, notify_pred, notify_succ);
        }

        info!(
            peer = %peer,
            trails = trail_count,
            friends = self.peers.len(),
            "Friend disconnected"
        );

        if self.peers.is_empty() {
            self.random_walk_due_ms = None;
        }
        true
    }

    /// Drop the interner reference taken when `peer` connected.
    pub(in crate::dht) fn release_short_id(&mut self, peer: &PeerId) {
        if let Some(short) = self.interner.lookup(peer) {
            self.interner.release(short);
        }
    }
}
