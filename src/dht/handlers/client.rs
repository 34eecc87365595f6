//! Local client operations: put and get.

use crate::datacache::{DataBlock, GetReply};
use crate::dht::{GetRequest, PutRequest, RoutingContext, RoutingError};
use crate::protocol::{PeerGet, PeerPut};
use crate::trail::Direction;
use tracing::debug;

impl RoutingContext {
    /// Store a block locally and send it along the finger closest to its key.
    ///
    /// Returns `NoRoute` when no valid finger exists; the local copy is
    /// kept regardless.
    pub fn handle_put(&mut self, req: PutRequest) -> Result<(), RoutingError> {
        self.datacache.put(
            req.key,
            DataBlock {
                block_type: req.block_type,
                expiration_us: req.expiration_us,
                put_path: Vec::new(),
                data: req.data.clone(),
            },
        );

        let finger = self.closest_finger(&req.key).ok_or(RoutingError::NoRoute)?;
        debug!(key = %req.key, destination = %finger.destination, "Routing put");

        let put = PeerPut {
            options: req.options,
            block_type: req.block_type,
            hop_count: 0,
            desired_replication_level: req.desired_replication_level,
            expiration_us: req.expiration_us,
            key: req.key,
            put_path: Vec::new(),
            data: req.data,
        };
        self.forward_on_trail(
            finger.trail,
            Direction::TowardSuccessor,
            put.encode(),
            Vec::new(),
            req.options.record_route,
        )
    }

    /// Answer a lookup from the local datacache and send it along the
    /// finger closest to its key.
    ///
    /// Local hits are delivered to clients immediately. Returns `NoRoute`
    /// when no valid finger exists.
    pub fn handle_get(&mut self, req: GetRequest) -> Result<(), RoutingError> {
        for block in self.datacache.get(&req.key, req.block_type) {
            self.clients.handle_reply(&GetReply {
                key: req.key,
                block_type: block.block_type,
                expiration_us: block.expiration_us,
                put_path: block.put_path,
                get_path: Vec::new(),
                data: block.data,
            });
        }

        let finger = self.closest_finger(&req.key).ok_or(RoutingError::NoRoute)?;
        debug!(key = %req.key, destination = %finger.destination, "Routing get");

        let get = PeerGet {
            options: req.options,
            block_type: req.block_type,
            hop_count: 0,
            desired_replication_level: req.desired_replication_level,
            key: req.key,
            get_path: Vec::new(),
        };
        self.forward_on_trail(
            finger.trail,
            Direction::TowardSuccessor,
            get.encode(),
            Vec::new(),
            req.options.record_route,
        )
    }
}
