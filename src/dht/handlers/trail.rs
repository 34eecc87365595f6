//! Trail teardown.

use crate::dht::RoutingContext;
use crate::protocol::TrailDestroy;
use crate::trail::{Direction, TrailKey};
use crate::PeerId;
use tracing::{debug, trace};

impl RoutingContext {
    /// Delete a trail.
    ///
    /// Sends a TrailDestroy to the predecessor and/or successor as
    /// requested, each carrying the id of its own link, then unlinks the
    /// trail from both friends, drops it from the registry and clears the
    /// finger slot it backs.
    pub fn delete_trail(
        &mut self,
        key: TrailKey,
        notify_predecessor: bool,
        notify_successor: bool,
    ) {
        let Some(trail) = self.trails.remove(key) else {
            self.invariant_violation("delete of unknown trail");
            return;
        };

        if let Some(pred) = trail.pred {
            if notify_predecessor && let Some(pred_id) = trail.pred_id {
                let frame = TrailDestroy { trail_id: pred_id }.encode();
                if self.send_to(&pred, frame) {
                    self.stats.trail_destroys_sent += 1;
                }
            }
            self.peers.unlink_predecessor(&pred, key);
        }

        if let Some(succ) = trail.succ {
            if notify_successor && let Some(succ_id) = trail.succ_id {
                let frame = TrailDestroy { trail_id: succ_id }.encode();
                if self.send_to(&succ, frame) {
                    self.stats.trail_destroys_sent += 1;
                }
            }
            self.peers.unlink_successor(&succ, key);
        }

        if let Some(slot) = trail.finger {
            let cleared = self
                .fingers
                .get_mut(slot.layer as usize)
                .and_then(|table| table.clear(slot.index, key));
            if cleared.is_none() {
                self.invariant_violation("finger slot already cleared");
            }
        }

        trace!(trail = %key, "Trail deleted");
    }

    /// Handle a TrailDestroy from a friend.
    ///
    /// The sender must be the neighbor on the side the id belongs to. The
    /// trail is deleted and only the opposite neighbor is notified.
    pub(in crate::dht) fn handle_trail_destroy(&mut self, from: &PeerId, msg: TrailDestroy) {
        let Some(key) = self.trails.lookup(&msg.trail_id) else {
            self.stats.unknown_trails += 1;
            debug!(from = %from, trail_id = %msg.trail_id, "TrailDestroy for unknown trail");
            return;
        };
        let side = self
            .trails
            .get(key)
            .and_then(|t| t.id_matches_side(&msg.trail_id, from));

        self.stats.trail_destroys_received += 1;
        match side {
            Some(Direction::TowardPredecessor) => self.delete_trail(key, false, true),
            Some(Direction::TowardSuccessor) => self.delete_trail(key, true, false),
            None => {
                self.stats.protocol_violations += 1;
                debug!(from = %from, trail_id = %msg.trail_id, "TrailDestroy from non-neighbor");
            }
        }
    }
}
