//! Tunnel Trees
//!
//! A tunnel tree records how every peer taking part in a multi-hop tunnel
//! is reached from the tunnel's root. Paths are spliced in and out as they
//! are discovered or break, and each node caches the locally adjacent peer
//! that starts the path toward it.
//!
//! Nodes live in an arena and refer to each other by index.

mod path;
mod tree;

pub use path::PeerPath;
pub use tree::TunnelTree;

use crate::peer::ShortPeerId;
use std::fmt;
use thiserror::Error;

/// Errors constructing a peer path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("peer {0} repeated on consecutive hops")]
    RepeatedHop(ShortPeerId),
}

/// Errors from tunnel tree operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("path starts at {got}, tree root is {expected}")]
    RootMismatch {
        expected: ShortPeerId,
        got: ShortPeerId,
    },

    #[error("peer {0} appears more than once in path")]
    PathLoop(ShortPeerId),

    #[error("the tree root cannot be deleted")]
    CannotDeleteRoot,
}

/// Connection state of a peer in a tunnel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Unknown,
    SearchingPath,
    WaitingForConnectAck,
    Connected,
    Reconnecting,
    Disconnected,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Unknown => "unknown",
            NodeStatus::SearchingPath => "searching",
            NodeStatus::WaitingForConnectAck => "waiting-ack",
            NodeStatus::Connected => "connected",
            NodeStatus::Reconnecting => "reconnecting",
            NodeStatus::Disconnected => "disconnected",
        };
        write!(f, "{}", name)
    }
}

/// Why a node is in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Root,
    /// Only there to reach other nodes; pruned once it has no children.
    Relay,
    /// End of a path that was added explicitly.
    Destination,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Root => "root",
            NodeRole::Relay => "relay",
            NodeRole::Destination => "destination",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of one tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub peer: ShortPeerId,
    pub parent: Option<ShortPeerId>,
    pub status: NodeStatus,
    pub role: NodeRole,
    pub first_hop: Option<ShortPeerId>,
}
