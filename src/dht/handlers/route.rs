//! Forwarding along trails and tunnel trees, and delivery of trail payloads.

use crate::datacache::{now_us, DataBlock, GetReply, PutNotice};
use crate::dht::{RoutingContext, RoutingError};
use crate::peer::ShortPeerId;
use crate::protocol::{
    FindSuccessor, PeerGet, PeerGetResult, PeerPut, ProtocolError, RouteOptions, TrailPayload,
    TrailRoute,
};
use crate::trail::{Direction, TrailKey};
use crate::tunnel::TunnelTree;
use crate::{HashCode, PeerId};
use tracing::{debug, trace};

impl RoutingContext {
    /// Send `payload` to the next hop of a trail.
    ///
    /// When `record_path` is set the local peer is appended to `path`. If
    /// the resulting frame would exceed the maximum message size, it is sent
    /// without any path and with recording disabled. Asking for a side the
    /// trail does not have is a routing error and the payload is dropped.
    pub fn forward_on_trail(
        &mut self,
        key: TrailKey,
        direction: Direction,
        payload: Vec<u8>,
        mut path: Vec<PeerId>,
        record_path: bool,
    ) -> Result<(), RoutingError> {
        let Some((next_hop, trail_id)) = self.trails.get(key).and_then(|t| t.hop(direction))
        else {
            self.stats.routing_errors += 1;
            debug!(trail = %key, direction = %direction, "No next hop on trail");
            return Err(RoutingError::NoRoute);
        };

        let max = self.max_message_size();
        let mut record_path = record_path;
        if record_path {
            path.push(self.my_id);
        }
        if TrailRoute::frame_size(path.len(), payload.len()) > max && !path.is_empty() {
            self.stats.paths_truncated += 1;
            debug!(trail = %key, path_len = path.len(), "Path too long, sending without it");
            path.clear();
            record_path = false;
        }
        let size = TrailRoute::frame_size(path.len(), payload.len());
        if size > max {
            self.stats.routing_errors += 1;
            debug!(trail = %key, size, max, "Payload too large for trail");
            return Err(RoutingError::MessageTooLarge { size, max });
        }

        let frame = TrailRoute {
            record_path,
            trail_id,
            path,
            payload,
        }
        .encode();
        self.send_to(&next_hop, frame);
        trace!(trail = %key, to = %next_hop, direction = %direction, "Trail message sent");
        Ok(())
    }

    /// Handle a TrailRoute from a friend.
    ///
    /// A message from the predecessor continues toward the successor and
    /// vice versa; when there is no next hop in that direction the payload
    /// is delivered here.
    pub(in crate::dht) fn handle_trail_route(&mut self, from: &PeerId, msg: TrailRoute) {
        let Some(key) = self.trails.lookup(&msg.trail_id) else {
            self.stats.unknown_trails += 1;
            debug!(from = %from, trail_id = %msg.trail_id, "TrailRoute for unknown trail");
            return;
        };
        let Some(trail) = self.trails.get(key) else {
            self.invariant_violation("id index points at missing trail");
            return;
        };
        let Some(arrived_from) = trail.id_matches_side(&msg.trail_id, from) else {
            self.stats.protocol_violations += 1;
            debug!(from = %from, trail_id = %msg.trail_id, "TrailRoute from non-neighbor");
            return;
        };
        let onward = arrived_from.reverse();

        if trail.hop(onward).is_some() {
            if self
                .forward_on_trail(key, onward, msg.payload, msg.path, msg.record_path)
                .is_ok()
            {
                self.stats.messages_forwarded += 1;
            }
            return;
        }

        self.deliver_payload(key, msg.trail_id, arrived_from, &msg.payload, msg.path);
    }

    /// Demultiplex a payload that reached the end of a trail.
    fn deliver_payload(
        &mut self,
        key: TrailKey,
        trail_id: HashCode,
        arrived_from: Direction,
        payload: &[u8],
        path: Vec<PeerId>,
    ) {
        let decoded = match TrailPayload::decode(payload) {
            Ok(p) => p,
            Err(ProtocolError::InvalidMessageType(t)) => {
                self.stats.unknown_payloads += 1;
                debug!(msg_type = t, "Unknown trail payload type");
                return;
            }
            Err(e) => {
                self.stats.protocol_violations += 1;
                debug!(error = %e, "Malformed trail payload");
                return;
            }
        };
        self.stats.messages_delivered += 1;
        trace!(trail = %key, payload = %decoded.message_type(), "Trail payload delivered");

        match decoded {
            TrailPayload::FindSuccessor(m) => self.handle_find_successor(key, arrived_from, m),
            TrailPayload::PeerGet(m) => self.handle_peer_get(trail_id, m, path),
            TrailPayload::PeerPut(m) => self.handle_peer_put(m, path),
            TrailPayload::PeerGetResult(m) => self.handle_peer_get_result(m, path),
        }
    }

    /// Answer a successor-find with the datacache entries following the key.
    ///
    /// Each entry travels back the way the request came as a PeerPut.
    fn handle_find_successor(
        &mut self,
        key: TrailKey,
        arrived_from: Direction,
        msg: FindSuccessor,
    ) {
        let entries = self
            .datacache
            .closest(&msg.key, self.config.dht.successor_results);
        debug!(key = %msg.key, entries = entries.len(), "Answering successor-find");

        for (entry_key, block) in entries {
            let put = PeerPut {
                options: RouteOptions::new(),
                block_type: block.block_type,
                hop_count: 0,
                desired_replication_level: 1,
                expiration_us: block.expiration_us,
                key: entry_key,
                put_path: block.put_path,
                data: block.data,
            };
            if self
                .forward_on_trail(key, arrived_from, put.encode(), Vec::new(), false)
                .is_err()
            {
                break;
            }
        }
    }

    /// Look up a requested key and send every hit back toward the requester.
    fn handle_peer_get(&mut self, trail_id: HashCode, msg: PeerGet, path: Vec<PeerId>) {
        let blocks = self.datacache.get(&msg.key, msg.block_type);
        debug!(key = %msg.key, hits = blocks.len(), "Answering get");

        for block in blocks {
            let result = PeerGetResult {
                block_type: block.block_type,
                expiration_us: block.expiration_us,
                key: msg.key,
                put_path: block.put_path,
                data: block.data,
            };
            self.send_get_result(&trail_id, result, path.clone(), msg.options.record_route);
        }
    }

    /// Store a block that reached the end of its trail.
    fn handle_peer_put(&mut self, msg: PeerPut, path: Vec<PeerId>) {
        if msg.expiration_us <= now_us() {
            self.stats.expired_puts += 1;
            debug!(key = %msg.key, "Dropped expired put");
            return;
        }
        let mut put_path = msg.put_path;
        if msg.options.record_route {
            put_path.extend(path);
        }

        self.datacache.put(
            msg.key,
            DataBlock {
                block_type: msg.block_type,
                expiration_us: msg.expiration_us,
                put_path: put_path.clone(),
                data: msg.data.clone(),
            },
        );
        self.clients.process_put(&PutNotice {
            key: msg.key,
            block_type: msg.block_type,
            expiration_us: msg.expiration_us,
            hop_count: msg.hop_count.saturating_add(1),
            desired_replication_level: msg.desired_replication_level,
            put_path,
            data: msg.data,
        });
        debug!(key = %msg.key, "Stored block from trail");
    }

    /// Hand a get result that reached its requester to local clients.
    fn handle_peer_get_result(&mut self, msg: PeerGetResult, path: Vec<PeerId>) {
        debug!(key = %msg.key, "Get result delivered");
        self.clients.handle_reply(&GetReply {
            key: msg.key,
            block_type: msg.block_type,
            expiration_us: msg.expiration_us,
            put_path: msg.put_path,
            get_path: path,
            data: msg.data,
        });
    }

    /// Send a get result back along the trail identified by `trail_id`.
    ///
    /// Unknown trails drop the result. A trail that started here delivers
    /// it to local clients; otherwise it goes toward the predecessor,
    /// recording the path if the request asked for it.
    pub fn send_get_result(
        &mut self,
        trail_id: &HashCode,
        result: PeerGetResult,
        get_path: Vec<PeerId>,
        record_path: bool,
    ) {
        let Some(key) = self.trails.lookup(trail_id) else {
            self.stats.unknown_trails += 1;
            debug!(trail_id = %trail_id, "Get result for unknown trail dropped");
            return;
        };
        let is_origin = self
            .trails
            .get(key)
            .is_some_and(|t| t.is_local_origin());

        if is_origin {
            self.handle_peer_get_result(result, get_path);
            return;
        }
        let _ = self.forward_on_trail(
            key,
            Direction::TowardPredecessor,
            result.encode(),
            get_path,
            record_path,
        );
    }

    /// Send `payload` toward `destination` through a tunnel tree.
    ///
    /// Uses the destination's cached first hop, which must resolve to a
    /// connected friend.
    pub fn forward_on_tree(
        &mut self,
        tree: &TunnelTree,
        destination: ShortPeerId,
        payload: Vec<u8>,
    ) -> Result<(), RoutingError> {
        let first_hop = tree
            .get_first_hop(destination)
            .ok_or(RoutingError::NoRoute)?;
        let Some(peer) = self.interner.resolve(first_hop) else {
            return Err(RoutingError::NoRoute);
        };
        if !self.peers.contains(&peer) {
            return Err(RoutingError::PeerNotConnected(peer));
        }
        let max = self.max_message_size();
        if payload.len() > max {
            return Err(RoutingError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }
        self.send_to(&peer, payload);
        trace!(destination = %destination, first_hop = %peer, "Tree message sent");
        Ok(())
    }
}
