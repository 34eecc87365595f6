//! Random walks: initiation, relaying and responses.
//!
//! A walk leaves this peer toward a random friend and is relayed to random
//! friends until its hop count exceeds the network size estimate. The last
//! hop answers with a keyspace location, which travels back along the trail
//! the walk built and becomes a finger at the initiator.

use crate::dht::{RoutingContext, RoutingError};
use crate::finger::FingerSlot;
use crate::protocol::{FindSuccessor, WalkInit, WalkResponse};
use crate::trail::{Direction, Trail, TrailKey};
use crate::{HashCode, PeerId};
use tracing::{debug, trace};

impl RoutingContext {
    /// Start the next scheduled walk.
    ///
    /// Layers are served round-robin. On success the next walk is scheduled
    /// using the bootstrap interval for the first walks and the steady-state
    /// delay afterwards. With no friends the engine goes idle until one
    /// connects.
    pub fn do_random_walk(&mut self, now_ms: u64) -> Result<TrailKey, RoutingError> {
        let layer = self.walk_layer;
        let result = self.initiate_random_walk_on_layer(layer, now_ms);

        match &result {
            Err(RoutingError::NoFriends) => {
                debug!("No friends, random walk engine idle");
                self.random_walk_due_ms = None;
            }
            _ => {
                self.walk_layer = (layer + 1) % self.layers();
                let delay = self.config.dht.walk_delay_ms(self.stats.walks_initiated);
                self.random_walk_due_ms = Some(now_ms.saturating_add(delay));
            }
        }
        result
    }

    /// Start a walk that will fill the next slot of `layer`.
    ///
    /// Evicts the slot's current finger (deleting its trail, notifying the
    /// successor), attaches a pending finger backed by a new trail toward a
    /// random friend and sends that friend a WalkInit.
    pub fn initiate_random_walk_on_layer(
        &mut self,
        layer: u16,
        now_ms: u64,
    ) -> Result<TrailKey, RoutingError> {
        let succ = self.peers.pick_random().ok_or(RoutingError::NoFriends)?;
        if layer >= self.layers() {
            self.invariant_violation("walk requested on nonexistent layer");
            return Err(RoutingError::NoRoute);
        }

        let index = self.fingers[layer as usize].next_slot();
        if let Some(occupant) = self.fingers[layer as usize].get(index).map(|f| f.trail) {
            self.stats.fingers_evicted += 1;
            debug!(layer, slot = index, trail = %occupant, "Evicting finger");
            if self.trails.contains(occupant) {
                self.delete_trail(occupant, false, true);
            }
            if self.fingers[layer as usize].take(index).is_some() {
                self.invariant_violation("evicted finger outlived its trail");
            }
        }

        let trail_id = HashCode::random();
        let mut trail = Trail::originated(succ, trail_id, self.trail_expiry(now_ms));
        trail.finger = Some(FingerSlot { layer, index });
        let key = match self.trails.register(trail) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Failed to register walk trail");
                return Err(e.into());
            }
        };
        self.peers.link_successor(&succ, key);
        if !self.fingers[layer as usize].attach(index, key) {
            self.invariant_violation("finger slot occupied after eviction");
        }

        let frame = WalkInit {
            hops_taken: 0,
            layer,
            trail_id,
        }
        .encode();
        self.send_to(&succ, frame);
        self.stats.walks_initiated += 1;

        debug!(layer, slot = index, peer = %succ, trail_id = %trail_id, "Random walk started");
        Ok(key)
    }

    /// Handle a WalkInit from a friend.
    ///
    /// Records a trail with the sender as predecessor. If the walk has gone
    /// further than the network size estimate this peer answers; otherwise
    /// it extends the walk to a random friend under a fresh trail id.
    pub(in crate::dht) fn handle_walk_init(&mut self, from: &PeerId, msg: WalkInit, now_ms: u64) {
        if msg.layer >= self.layers() {
            self.stats.protocol_violations += 1;
            debug!(from = %from, layer = msg.layer, "WalkInit for unknown layer");
            return;
        }

        let trail = Trail::from_predecessor(*from, msg.trail_id, self.trail_expiry(now_ms));
        let key = match self.trails.register(trail) {
            Ok(key) => key,
            Err(e) => {
                self.stats.protocol_violations += 1;
                debug!(from = %from, error = %e, "WalkInit trail rejected");
                return;
            }
        };
        self.peers.link_predecessor(from, key);

        if msg.hops_taken as u32 > self.nse.estimate() {
            let location = self.walk_location(msg.layer);
            let frame = WalkResponse {
                trail_id: msg.trail_id,
                location,
            }
            .encode();
            self.send_to(from, frame);
            self.stats.walks_answered += 1;
            debug!(
                from = %from,
                layer = msg.layer,
                hops = msg.hops_taken,
                location = %location,
                "Random walk ends here"
            );
            return;
        }

        let Some(succ) = self.peers.pick_random() else {
            self.invariant_violation("no friend to extend walk");
            self.delete_trail(key, false, false);
            return;
        };
        let next_id = HashCode::random();
        if let Err(e) = self
            .trails
            .register_id(key, Direction::TowardSuccessor, next_id)
        {
            debug!(error = %e, "Failed to register walk extension");
            self.delete_trail(key, true, false);
            return;
        }
        if let Some(trail) = self.trails.get_mut(key) {
            trail.succ = Some(succ);
        }
        self.peers.link_successor(&succ, key);

        let frame = WalkInit {
            hops_taken: msg.hops_taken.saturating_add(1),
            layer: msg.layer,
            trail_id: next_id,
        }
        .encode();
        self.send_to(&succ, frame);
        self.stats.walks_relayed += 1;
        trace!(from = %from, to = %succ, hops = msg.hops_taken, "Random walk relayed");
    }

    /// Handle a WalkResponse from a friend.
    ///
    /// Must arrive from the successor of a known trail. Relays pass it on to
    /// their predecessor; the initiator turns it into a valid finger.
    pub(in crate::dht) fn handle_walk_response(&mut self, from: &PeerId, msg: WalkResponse) {
        let Some(key) = self.trails.lookup(&msg.trail_id) else {
            self.stats.unknown_trails += 1;
            debug!(from = %from, trail_id = %msg.trail_id, "WalkResponse for unknown trail");
            return;
        };
        let Some(trail) = self.trails.get(key).cloned() else {
            self.invariant_violation("id index points at missing trail");
            return;
        };
        if trail.id_matches_side(&msg.trail_id, from) != Some(Direction::TowardSuccessor) {
            self.stats.protocol_violations += 1;
            debug!(from = %from, trail_id = %msg.trail_id, "WalkResponse not from successor");
            return;
        }

        if let Some((pred, pred_id)) = trail.hop(Direction::TowardPredecessor) {
            let frame = WalkResponse {
                trail_id: pred_id,
                location: msg.location,
            }
            .encode();
            self.send_to(&pred, frame);
            self.stats.walk_responses_forwarded += 1;
            trace!(to = %pred, "WalkResponse forwarded");
            return;
        }

        let Some(slot) = trail.finger else {
            self.invariant_violation("locally started trail without finger");
            return;
        };
        let completed = self
            .fingers
            .get_mut(slot.layer as usize)
            .is_some_and(|table| table.complete(slot.index, key, msg.location));
        if !completed {
            debug!(slot = %slot, "WalkResponse for finger that is not pending");
            return;
        }

        self.stats.fingers_completed += 1;
        debug!(slot = %slot, destination = %msg.location, "Finger established");

        if self.config.dht.request_successors {
            let payload = FindSuccessor { key: msg.location }.encode();
            let _ = self.forward_on_trail(
                key,
                Direction::TowardSuccessor,
                payload,
                Vec::new(),
                false,
            );
        }
    }

    /// Location reported by a walk ending here on `layer`.
    ///
    /// Layer 0 reports a random key from the datacache; higher layers report
    /// the destination of a random valid finger one layer down. Either falls
    /// back to a fresh random location.
    fn walk_location(&self, layer: u16) -> HashCode {
        let chosen = if layer == 0 {
            self.datacache.random_key()
        } else {
            self.fingers
                .get(layer as usize - 1)
                .and_then(|table| table.random_valid())
                .map(|f| f.destination)
        };
        chosen.unwrap_or_else(HashCode::random)
    }
}
