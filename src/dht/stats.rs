//! Routing counters.

/// Counters for routing decisions and dropped input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingStats {
    /// Walks this peer started.
    pub walks_initiated: u64,
    /// Walk steps relayed onward.
    pub walks_relayed: u64,
    /// Walks that ended here.
    pub walks_answered: u64,
    /// Walk responses passed back toward their initiator.
    pub walk_responses_forwarded: u64,
    /// Fingers that became valid.
    pub fingers_completed: u64,
    /// Occupied finger slots overwritten by a new walk.
    pub fingers_evicted: u64,
    pub trails_expired: u64,
    pub trail_destroys_sent: u64,
    pub trail_destroys_received: u64,
    /// TrailRoute messages relayed onward.
    pub messages_forwarded: u64,
    /// TrailRoute payloads consumed here.
    pub messages_delivered: u64,
    /// Forwards requested on a side the trail does not have.
    pub routing_errors: u64,
    /// Messages sent without their recorded path to fit the size limit.
    pub paths_truncated: u64,
    /// Malformed or inconsistent input from friends.
    pub protocol_violations: u64,
    /// Messages naming a trail id we do not know.
    pub unknown_trails: u64,
    /// Delivered payloads of an unknown type.
    pub unknown_payloads: u64,
    /// Puts whose block had already expired on arrival.
    pub expired_puts: u64,
    /// Frames a friend channel refused.
    pub send_failures: u64,
    /// Local bookkeeping found inconsistent.
    pub invariant_violations: u64,
}

impl RoutingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
