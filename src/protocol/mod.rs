//! Meshtrail Protocol Messages
//!
//! Wire format definitions for messages exchanged between directly connected
//! peers. Every message starts with a 4-byte header `[size:2][type:2]` in
//! network byte order; `size` counts the header itself.
//!
//! ## Peer-to-peer messages
//!
//! `WalkInit`, `WalkResponse`, `TrailDestroy` and `TrailRoute` travel
//! directly between friends and are decoded into [`RoutingMessage`].
//!
//! ## Trail payloads
//!
//! `FindSuccessor`, `PeerGet`, `PeerPut` and `PeerGetResult` only travel
//! embedded in a `TrailRoute` and are decoded into [`TrailPayload`] at the
//! peer that consumes them.

mod error;
mod header;
mod payload;
mod trail;
mod walk;

pub use error::ProtocolError;
pub use header::{MessageHeader, MessageType, HEADER_SIZE, MAX_MESSAGE_SIZE};
pub use payload::{
    FindSuccessor, PeerGet, PeerGetResult, PeerPut, RouteOptions, TrailPayload,
};
pub use trail::{TrailDestroy, TrailRoute};
pub use walk::{WalkInit, WalkResponse};

/// A decoded message received from a friend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingMessage {
    WalkInit(WalkInit),
    WalkResponse(WalkResponse),
    TrailDestroy(TrailDestroy),
    TrailRoute(TrailRoute),
}

impl RoutingMessage {
    /// Decode a complete frame received from a peer.
    ///
    /// Trail payload types arriving outside a TrailRoute are rejected with
    /// `InvalidMessageType`.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = MessageHeader::parse_exact(frame)?;
        match header.message_type() {
            Some(MessageType::WalkInit) => Ok(RoutingMessage::WalkInit(WalkInit::decode(frame)?)),
            Some(MessageType::WalkResponse) => {
                Ok(RoutingMessage::WalkResponse(WalkResponse::decode(frame)?))
            }
            Some(MessageType::TrailDestroy) => {
                Ok(RoutingMessage::TrailDestroy(TrailDestroy::decode(frame)?))
            }
            Some(MessageType::TrailRoute) => {
                Ok(RoutingMessage::TrailRoute(TrailRoute::decode(frame)?))
            }
            _ => Err(ProtocolError::InvalidMessageType(header.msg_type)),
        }
    }

    /// Encode as a message frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RoutingMessage::WalkInit(m) => m.encode(),
            RoutingMessage::WalkResponse(m) => m.encode(),
            RoutingMessage::TrailDestroy(m) => m.encode(),
            RoutingMessage::TrailRoute(m) => m.encode(),
        }
    }

    /// Wire type of the message.
    pub fn message_type(&self) -> MessageType {
        match self {
            RoutingMessage::WalkInit(_) => MessageType::WalkInit,
            RoutingMessage::WalkResponse(_) => MessageType::WalkResponse,
            RoutingMessage::TrailDestroy(_) => MessageType::TrailDestroy,
            RoutingMessage::TrailRoute(_) => MessageType::TrailRoute,
        }
    }
}
