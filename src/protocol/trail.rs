//! Trail maintenance and routing: TrailDestroy and TrailRoute.

use super::header::{begin_frame, finish_frame, open_frame, MessageHeader, HEADER_SIZE};
use super::{MessageType, ProtocolError};
use crate::identity::PEER_ID_SIZE;
use crate::{HashCode, PeerId};

/// Notification that the sender has torn down its side of a trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailDestroy {
    /// Trail id as known on the link between sender and receiver.
    pub trail_id: HashCode,
}

impl TrailDestroy {
    /// Encoded frame size.
    pub const SIZE: usize = 40;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][reserved:4][trail_id:32]`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = begin_frame(Self::SIZE);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(self.trail_id.as_bytes());
        finish_frame(MessageType::TrailDestroy, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::TrailDestroy)?;
        let _reserved = r.u32()?;
        Ok(Self {
            trail_id: r.hash()?,
        })
    }
}

/// A payload message carried along a trail.
///
/// The payload is itself a complete framed message (FindSuccessor, PeerGet,
/// PeerPut or PeerGetResult). When `record_path` is set every hop appends its
/// own identity to `path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailRoute {
    /// Whether hops append themselves to `path`.
    pub record_path: bool,
    /// Trail id of the leg this message travels on.
    pub trail_id: HashCode,
    /// Peers traversed so far.
    pub path: Vec<PeerId>,
    /// Embedded message frame.
    pub payload: Vec<u8>,
}

impl TrailRoute {
    /// Size of the fixed part, header included.
    pub const BASE_SIZE: usize = HEADER_SIZE + 4 + 32;

    /// Frame size for a given path length and payload size.
    pub fn frame_size(path_len: usize, payload_len: usize) -> usize {
        Self::BASE_SIZE + path_len * PEER_ID_SIZE + payload_len
    }

    /// Size of this message once encoded.
    pub fn encoded_len(&self) -> usize {
        Self::frame_size(self.path.len(), self.payload.len())
    }

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][record_path:2][path_length:2][trail_id:32]`
    ///         `[path:32×n][payload]`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = begin_frame(self.encoded_len());
        buf.extend_from_slice(&(self.record_path as u16).to_be_bytes());
        buf.extend_from_slice(&(self.path.len() as u16).to_be_bytes());
        buf.extend_from_slice(self.trail_id.as_bytes());
        for peer in &self.path {
            buf.extend_from_slice(peer.as_bytes());
        }
        buf.extend_from_slice(&self.payload);
        finish_frame(MessageType::TrailRoute, buf)
    }

    /// Decode from a complete frame.
    ///
    /// The embedded payload must carry its own header whose size accounts
    /// for exactly the remaining bytes of the frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::TrailRoute)?;
        let record_path = r.u16()? != 0;
        let path_length = r.u16()? as usize;
        let trail_id = r.hash()?;
        let path = r.peer_path(path_length)?;
        let payload = r.rest();

        let inner = MessageHeader::parse(payload)?;
        if inner.size as usize != payload.len() {
            return Err(ProtocolError::SizeMismatch {
                declared: inner.size as usize,
                actual: payload.len(),
            });
        }

        Ok(Self {
            record_path,
            trail_id,
            path,
            payload: payload.to_vec(),
        })
    }
}
