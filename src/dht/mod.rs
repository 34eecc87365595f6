//! Trail-Based Routing Core
//!
//! [`RoutingContext`] is the single routing actor of a peer. It owns the
//! friend table, the trail registry, one finger table per layer and the
//! collaborators it consults, and is mutated only through `&mut self`:
//! every inbound message, friend change and timer firing is processed to
//! completion before the next one.
//!
//! Handlers live in `handlers/`, split by concern the same way the event
//! loop dispatches them.

mod handlers;
mod stats;
#[cfg(test)]
mod tests;

pub use stats::RoutingStats;

use crate::datacache::{
    ChannelNotifier, ClientNotifier, ClientTx, Datacache, FixedSizeEstimate, MemoryDatacache,
    NetworkSizeEstimator,
};
use crate::finger::{Finger, FingerTable};
use crate::peer::{PeerError, PeerInterner, PeerTable, PeerTx};
use crate::protocol::RouteOptions;
use crate::trail::{TrailError, TrailRegistry};
use crate::{Config, ConfigError, HashCode, Identity, PeerId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Errors returned for local preconditions of routing operations.
///
/// Anomalies caused by remote peers never surface here; they are logged and
/// counted in [`RoutingStats`].
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no connected friends")]
    NoFriends,

    #[error("no route to destination")]
    NoRoute,

    #[error("peer not connected: {0}")]
    PeerNotConnected(PeerId),

    #[error("message too large: max {max}, got {size}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("trail error: {0}")]
    Trail(#[from] TrailError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// A store request from a local client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutRequest {
    pub key: HashCode,
    pub block_type: u32,
    pub options: RouteOptions,
    pub desired_replication_level: u32,
    /// Absolute expiration in microseconds.
    pub expiration_us: u64,
    pub data: Vec<u8>,
}

/// A lookup request from a local client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetRequest {
    pub key: HashCode,
    pub block_type: u32,
    pub options: RouteOptions,
    pub desired_replication_level: u32,
}

/// Input to the routing loop.
#[derive(Debug)]
pub enum RoutingEvent {
    /// A friend became directly reachable.
    PeerConnected { peer: PeerId, tx: PeerTx },
    /// A friend went away.
    PeerDisconnected { peer: PeerId },
    /// A frame arrived from a friend.
    Message { from: PeerId, data: Vec<u8> },
    /// Local client store.
    Put(PutRequest),
    /// Local client lookup.
    Get(GetRequest),
    /// Tear everything down and leave the loop.
    Shutdown,
}

/// Sender half of the routing event channel.
pub type EventTx = mpsc::Sender<RoutingEvent>;
/// Receiver half of the routing event channel.
pub type EventRx = mpsc::Receiver<RoutingEvent>;

/// Create the routing event channel.
pub fn event_channel(buffer: usize) -> (EventTx, EventRx) {
    mpsc::channel(buffer)
}

/// External services the routing core consults.
pub struct Collaborators {
    pub nse: Box<dyn NetworkSizeEstimator>,
    pub datacache: Box<dyn Datacache>,
    pub clients: Box<dyn ClientNotifier>,
}

impl Collaborators {
    /// Fixed network size estimate, in-memory datacache and channel notifier.
    pub fn in_memory(estimate: u32, datacache_capacity: usize, clients: ClientTx) -> Self {
        Self {
            nse: Box::new(FixedSizeEstimate(estimate)),
            datacache: Box::new(MemoryDatacache::new(datacache_capacity)),
            clients: Box::new(ChannelNotifier::new(clients)),
        }
    }
}

/// The routing actor of one peer.
pub struct RoutingContext {
    identity: Identity,
    my_id: PeerId,
    config: Config,
    peers: PeerTable,
    interner: PeerInterner,
    trails: TrailRegistry,
    fingers: Vec<FingerTable>,
    /// Layer the next random walk populates.
    walk_layer: u16,
    /// When the next random walk is due; `None` while idle.
    random_walk_due_ms: Option<u64>,
    nse: Box<dyn NetworkSizeEstimator>,
    datacache: Box<dyn Datacache>,
    clients: Box<dyn ClientNotifier>,
    stats: RoutingStats,
    /// Origin of the millisecond clock used by the event loop.
    epoch: Instant,
}

impl RoutingContext {
    /// Create a routing context for `identity`.
    pub fn new(identity: Identity, config: Config, collaborators: Collaborators) -> Self {
        let my_id = *identity.peer_id();
        let layers = config.dht.layers.max(1);
        let fingers = (0..layers)
            .map(|layer| FingerTable::new(layer, config.dht.finger_array_size))
            .collect();
        debug!(peer = %my_id, layers, "Routing context created");
        Self {
            identity,
            my_id,
            config,
            peers: PeerTable::new(),
            interner: PeerInterner::new(),
            trails: TrailRegistry::new(),
            fingers,
            walk_layer: 0,
            random_walk_due_ms: None,
            nse: collaborators.nse,
            datacache: collaborators.datacache,
            clients: collaborators.clients,
            stats: RoutingStats::new(),
            epoch: Instant::now(),
        }
    }

    /// Create a routing context with the identity named in `config`.
    pub fn from_config(config: Config, collaborators: Collaborators) -> Result<Self, RoutingError> {
        let identity = config.create_identity()?;
        Ok(Self::new(identity, config, collaborators))
    }

    // === Accessors ===

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.my_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn interner(&self) -> &PeerInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut PeerInterner {
        &mut self.interner
    }

    pub fn trails(&self) -> &TrailRegistry {
        &self.trails
    }

    pub fn stats(&self) -> &RoutingStats {
        &self.stats
    }

    /// Number of finger layers.
    pub fn layers(&self) -> u16 {
        self.fingers.len() as u16
    }

    pub fn finger_table(&self, layer: u16) -> Option<&FingerTable> {
        self.fingers.get(layer as usize)
    }

    /// When the next random walk is due, if one is scheduled.
    pub fn random_walk_due(&self) -> Option<u64> {
        self.random_walk_due_ms
    }

    /// Earliest pending timer: next walk or next trail expiration.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.random_walk_due_ms, self.trails.next_expiry()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Milliseconds elapsed on the loop clock.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    // === Internal helpers ===

    fn trail_expiry(&self, now_ms: u64) -> u64 {
        now_ms.saturating_add(self.config.dht.trail_timeout_ms())
    }

    /// Largest frame we hand to a friend.
    fn max_message_size(&self) -> usize {
        self.config
            .dht
            .max_message_size
            .min(crate::protocol::MAX_MESSAGE_SIZE)
    }

    /// The valid finger across all layers whose destination is the closest
    /// ring successor of `key`.
    pub(in crate::dht) fn closest_finger(&mut self, key: &HashCode) -> Option<Finger> {
        let mut best: Option<Finger> = None;
        for table in self.fingers.iter_mut() {
            if let Some(candidate) = table.closest(key) {
                best = match best {
                    Some(current)
                        if key.cmp_successor(&current.destination, &candidate.destination)
                            != std::cmp::Ordering::Greater =>
                    {
                        Some(current)
                    }
                    _ => Some(candidate),
                };
            }
        }
        best
    }

    /// Queue a frame for a friend, counting failures.
    pub(in crate::dht) fn send_to(&mut self, peer: &PeerId, frame: Vec<u8>) -> bool {
        match self.peers.send(peer, frame) {
            Ok(()) => true,
            Err(e) => {
                self.stats.send_failures += 1;
                match e {
                    PeerError::NotConnected(_) => {
                        debug!(peer = %peer, "Send to unknown friend dropped")
                    }
                    _ => debug!(peer = %peer, error = %e, "Send failed"),
                }
                false
            }
        }
    }

    /// Log and count a local invariant violation.
    pub(in crate::dht) fn invariant_violation(&mut self, what: &str) {
        self.stats.invariant_violations += 1;
        warn!(violation = what, "Routing invariant violated");
    }
}
