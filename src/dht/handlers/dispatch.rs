//! Inbound message and event dispatch.

use crate::dht::{RoutingContext, RoutingEvent};
use crate::protocol::RoutingMessage;
use crate::PeerId;
use tracing::debug;

impl RoutingContext {
    /// Decode a frame from a friend and dispatch it to its handler.
    ///
    /// Frames from peers that are not friends and frames that fail to
    /// decode are dropped.
    pub fn handle_message(&mut self, from: &PeerId, data: &[u8], now_ms: u64) {
        if !self.peers.contains(from) {
            self.stats.protocol_violations += 1;
            debug!(from = %from, "Message from non-friend dropped");
            return;
        }

        let msg = match RoutingMessage::decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.protocol_violations += 1;
                debug!(from = %from, error = %e, "Malformed routing message");
                return;
            }
        };

        match msg {
            RoutingMessage::WalkInit(m) => self.handle_walk_init(from, m, now_ms),
            RoutingMessage::WalkResponse(m) => self.handle_walk_response(from, m),
            RoutingMessage::TrailDestroy(m) => self.handle_trail_destroy(from, m),
            RoutingMessage::TrailRoute(m) => self.handle_trail_route(from, m),
        }
    }

    /// Apply one event from the routing channel.
    ///
    /// Returns false for `Shutdown`.
    pub fn handle_event(&mut self, event: RoutingEvent, now_ms: u64) -> bool {
        match event {
            RoutingEvent::PeerConnected { peer, tx } => {
                self.peer_connected(peer, tx, now_ms);
            }
            RoutingEvent::PeerDisconnected { peer } => {
                self.peer_disconnected(&peer);
            }
            RoutingEvent::Message { from, data } => {
                self.handle_message(&from, &data, now_ms);
            }
            RoutingEvent::Put(req) => {
                if let Err(e) = self.handle_put(req) {
                    debug!(error = %e, "Put not routed");
                }
            }
            RoutingEvent::Get(req) => {
                if let Err(e) = self.handle_get(req) {
                    debug!(error = %e, "Get not routed");
                }
            }
            RoutingEvent::Shutdown => return false,
        }
        true
    }
}
