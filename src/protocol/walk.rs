//! Random-walk messages: WalkInit and WalkResponse.

use super::header::{begin_frame, finish_frame, open_frame};
use super::{MessageType, ProtocolError};
use crate::HashCode;

/// One step of a random walk.
///
/// Sent by the initiator with `hops_taken = 0` and re-sent by every relay
/// with the count incremented and a fresh trail id for the next leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkInit {
    /// Hops the walk has travelled so far.
    pub hops_taken: u16,
    /// Finger layer this walk populates.
    pub layer: u16,
    /// Trail id for the leg between sender and receiver.
    pub trail_id: HashCode,
}

impl WalkInit {
    /// Encoded frame size.
    pub const SIZE: usize = 40;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][hops_taken:2][layer:2][trail_id:32]`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = begin_frame(Self::SIZE);
        buf.extend_from_slice(&self.hops_taken.to_be_bytes());
        buf.extend_from_slice(&self.layer.to_be_bytes());
        buf.extend_from_slice(self.trail_id.as_bytes());
        finish_frame(MessageType::WalkInit, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::WalkInit)?;
        Ok(Self {
            hops_taken: r.u16()?,
            layer: r.u16()?,
            trail_id: r.hash()?,
        })
    }
}

/// Result of a random walk, relayed back toward the initiator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkResponse {
    /// Trail id of the leg this response travels on.
    pub trail_id: HashCode,
    /// Keyspace location the walk ended at.
    pub location: HashCode,
}

impl WalkResponse {
    /// Encoded frame size.
    pub const SIZE: usize = 72;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][reserved:4][trail_id:32][location:32]`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = begin_frame(Self::SIZE);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(self.trail_id.as_bytes());
        buf.extend_from_slice(self.location.as_bytes());
        finish_frame(MessageType::WalkResponse, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::WalkResponse)?;
        let _reserved = r.u32()?;
        Ok(Self {
            trail_id: r.hash()?,
            location: r.hash()?,
        })
    }
}
