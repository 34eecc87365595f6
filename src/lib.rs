//! Meshtrail: Trail-Based Overlay Routing
//!
//! Routing substrate for peer-to-peer overlays. Random walks over the
//! friend graph build multi-hop trails and per-layer finger tables that
//! carry key lookups and stores; tunnel trees track how the participants of
//! a multi-hop tunnel are reached.

pub mod config;
pub mod datacache;
pub mod dht;
pub mod finger;
pub mod identity;
pub mod peer;
pub mod protocol;
pub mod trail;
pub mod tunnel;

// Re-export identity types
pub use identity::{HashCode, Identity, IdentityError, PeerId, HASH_SIZE, PEER_ID_SIZE};

// Re-export config types
pub use config::{BuffersConfig, Config, ConfigError, DhtConfig, IdentityConfig, NodeConfig};

// Re-export protocol types
pub use protocol::{
    FindSuccessor, MessageHeader, MessageType, PeerGet, PeerGetResult, PeerPut, ProtocolError,
    RouteOptions, RoutingMessage, TrailDestroy, TrailPayload, TrailRoute, WalkInit, WalkResponse,
};

// Re-export peer types
pub use peer::{
    peer_channel, Friend, PeerError, PeerInterner, PeerRx, PeerTable, PeerTx, ShortPeerId,
};

// Re-export trail and finger types
pub use finger::{Finger, FingerSlot, FingerTable};
pub use trail::{Direction, Trail, TrailError, TrailKey, TrailRegistry};

// Re-export collaborator types
pub use datacache::{
    client_channel, ChannelNotifier, ClientEvent, ClientNotifier, ClientRx, ClientTx, DataBlock,
    Datacache, FixedSizeEstimate, GetReply, MemoryDatacache, NetworkSizeEstimator, PutNotice,
    BLOCK_TYPE_ANY,
};

// Re-export routing types
pub use dht::{
    event_channel, Collaborators, EventRx, EventTx, GetRequest, PutRequest, RoutingContext,
    RoutingError, RoutingEvent, RoutingStats,
};

// Re-export tunnel types
pub use tunnel::{NodeInfo, NodeRole, NodeStatus, PathError, PeerPath, TreeError, TunnelTree};
