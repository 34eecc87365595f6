//! Messages carried inside a TrailRoute: successor-find and data operations.

use super::header::{begin_frame, finish_frame, open_frame, MessageHeader};
use super::{MessageType, ProtocolError};
use crate::identity::PEER_ID_SIZE;
use crate::{HashCode, PeerId};

// ============================================================================
// Route Options
// ============================================================================

/// Per-request routing options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Deliver to every peer on the route, not just the last.
    pub demultiplex_everywhere: bool,
    /// Record the peers traversed.
    pub record_route: bool,
}

impl RouteOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record_route flag.
    pub fn with_record_route(mut self) -> Self {
        self.record_route = true;
        self
    }

    /// Convert to the wire value.
    pub fn to_u32(&self) -> u32 {
        let mut flags = 0u32;
        if self.demultiplex_everywhere {
            flags |= 0x01;
        }
        if self.record_route {
            flags |= 0x02;
        }
        flags
    }

    /// Convert from the wire value. Unknown bits are ignored.
    pub fn from_u32(v: u32) -> Self {
        Self {
            demultiplex_everywhere: v & 0x01 != 0,
            record_route: v & 0x02 != 0,
        }
    }
}

fn write_path(buf: &mut Vec<u8>, path: &[PeerId]) {
    for peer in path {
        buf.extend_from_slice(peer.as_bytes());
    }
}

// ============================================================================
// FindSuccessor
// ============================================================================

/// Request for the entries following `key` at the far end of a trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindSuccessor {
    /// Key whose successors are requested.
    pub key: HashCode,
}

impl FindSuccessor {
    /// Encoded frame size.
    pub const SIZE: usize = 40;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][reserved:4][key:32]`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = begin_frame(Self::SIZE);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        finish_frame(MessageType::FindSuccessor, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::FindSuccessor)?;
        let _reserved = r.u32()?;
        Ok(Self { key: r.hash()? })
    }
}

// ============================================================================
// PeerPut
// ============================================================================

/// Store a data block at the far end of a trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerPut {
    pub options: RouteOptions,
    pub block_type: u32,
    pub hop_count: u32,
    pub desired_replication_level: u32,
    /// Absolute expiration in microseconds.
    pub expiration_us: u64,
    pub key: HashCode,
    /// Peers the put has traversed, when recorded.
    pub put_path: Vec<PeerId>,
    pub data: Vec<u8>,
}

impl PeerPut {
    /// Fixed part of the frame, header included.
    pub const BASE_SIZE: usize = 4 + 5 * 4 + 8 + 32;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][options:4][block_type:4][hop_count:4]`
    ///         `[replication:4][put_path_length:4][expiration:8][key:32]`
    ///         `[put_path:32×n][data]`
    pub fn encode(&self) -> Vec<u8> {
        let size = Self::BASE_SIZE + self.put_path.len() * PEER_ID_SIZE + self.data.len();
        let mut buf = begin_frame(size);
        buf.extend_from_slice(&self.options.to_u32().to_be_bytes());
        buf.extend_from_slice(&self.block_type.to_be_bytes());
        buf.extend_from_slice(&self.hop_count.to_be_bytes());
        buf.extend_from_slice(&self.desired_replication_level.to_be_bytes());
        buf.extend_from_slice(&(self.put_path.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.expiration_us.to_be_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        write_path(&mut buf, &self.put_path);
        buf.extend_from_slice(&self.data);
        finish_frame(MessageType::PeerPut, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::PeerPut)?;
        let options = RouteOptions::from_u32(r.u32()?);
        let block_type = r.u32()?;
        let hop_count = r.u32()?;
        let desired_replication_level = r.u32()?;
        let put_path_length = r.u32()? as usize;
        let expiration_us = r.u64()?;
        let key = r.hash()?;
        let put_path = r.peer_path(put_path_length)?;
        let data = r.rest().to_vec();
        Ok(Self {
            options,
            block_type,
            hop_count,
            desired_replication_level,
            expiration_us,
            key,
            put_path,
            data,
        })
    }
}

// ============================================================================
// PeerGet
// ============================================================================

/// Look up data blocks at the far end of a trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerGet {
    pub options: RouteOptions,
    pub block_type: u32,
    pub hop_count: u32,
    pub desired_replication_level: u32,
    pub key: HashCode,
    /// Peers the request has traversed, when recorded.
    pub get_path: Vec<PeerId>,
}

impl PeerGet {
    /// Fixed part of the frame, header included.
    pub const BASE_SIZE: usize = 4 + 5 * 4 + 32;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][options:4][block_type:4][hop_count:4]`
    ///         `[replication:4][get_path_length:4][key:32][get_path:32×n]`
    pub fn encode(&self) -> Vec<u8> {
        let size = Self::BASE_SIZE + self.get_path.len() * PEER_ID_SIZE;
        let mut buf = begin_frame(size);
        buf.extend_from_slice(&self.options.to_u32().to_be_bytes());
        buf.extend_from_slice(&self.block_type.to_be_bytes());
        buf.extend_from_slice(&self.hop_count.to_be_bytes());
        buf.extend_from_slice(&self.desired_replication_level.to_be_bytes());
        buf.extend_from_slice(&(self.get_path.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        write_path(&mut buf, &self.get_path);
        finish_frame(MessageType::PeerGet, buf)
    }

    /// Decode from a complete frame. Trailing bytes are rejected.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::PeerGet)?;
        let options = RouteOptions::from_u32(r.u32()?);
        let block_type = r.u32()?;
        let hop_count = r.u32()?;
        let desired_replication_level = r.u32()?;
        let get_path_length = r.u32()? as usize;
        let key = r.hash()?;
        let get_path = r.peer_path(get_path_length)?;
        r.finish()?;
        Ok(Self {
            options,
            block_type,
            hop_count,
            desired_replication_level,
            key,
            get_path,
        })
    }
}

// ============================================================================
// PeerGetResult
// ============================================================================

/// A data block answering a PeerGet, travelling back toward the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerGetResult {
    pub block_type: u32,
    /// Absolute expiration in microseconds.
    pub expiration_us: u64,
    pub key: HashCode,
    /// Path the block took when it was stored.
    pub put_path: Vec<PeerId>,
    pub data: Vec<u8>,
}

impl PeerGetResult {
    /// Fixed part of the frame, header included.
    pub const BASE_SIZE: usize = 4 + 4 + 4 + 8 + 32;

    /// Encode as wire format.
    ///
    /// Format: `[size:2][type:2][block_type:4][put_path_length:4]`
    ///         `[expiration:8][key:32][put_path:32×n][data]`
    pub fn encode(&self) -> Vec<u8> {
        let size = Self::BASE_SIZE + self.put_path.len() * PEER_ID_SIZE + self.data.len();
        let mut buf = begin_frame(size);
        buf.extend_from_slice(&self.block_type.to_be_bytes());
        buf.extend_from_slice(&(self.put_path.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.expiration_us.to_be_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        write_path(&mut buf, &self.put_path);
        buf.extend_from_slice(&self.data);
        finish_frame(MessageType::PeerGetResult, buf)
    }

    /// Decode from a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = open_frame(frame, MessageType::PeerGetResult)?;
        let block_type = r.u32()?;
        let put_path_length = r.u32()? as usize;
        let expiration_us = r.u64()?;
        let key = r.hash()?;
        let put_path = r.peer_path(put_path_length)?;
        let data = r.rest().to_vec();
        Ok(Self {
            block_type,
            expiration_us,
            key,
            put_path,
            data,
        })
    }
}

// ============================================================================
// Payload Dispatch
// ============================================================================

/// A decoded message delivered at the end of a trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrailPayload {
    FindSuccessor(FindSuccessor),
    PeerGet(PeerGet),
    PeerPut(PeerPut),
    PeerGetResult(PeerGetResult),
}

impl TrailPayload {
    /// Decode an embedded message frame.
    ///
    /// Returns `InvalidMessageType` for any type that cannot travel inside a
    /// TrailRoute.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = MessageHeader::parse(frame)?;
        match header.message_type() {
            Some(MessageType::FindSuccessor) => {
                Ok(TrailPayload::FindSuccessor(FindSuccessor::decode(frame)?))
            }
            Some(MessageType::PeerGet) => Ok(TrailPayload::PeerGet(PeerGet::decode(frame)?)),
            Some(MessageType::PeerPut) => Ok(TrailPayload::PeerPut(PeerPut::decode(frame)?)),
            Some(MessageType::PeerGetResult) => {
                Ok(TrailPayload::PeerGetResult(PeerGetResult::decode(frame)?))
            }
            _ => Err(ProtocolError::InvalidMessageType(header.msg_type)),
        }
    }

    /// Encode as a message frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TrailPayload::FindSuccessor(m) => m.encode(),
            TrailPayload::PeerGet(m) => m.encode(),
            TrailPayload::PeerPut(m) => m.encode(),
            TrailPayload::PeerGetResult(m) => m.encode(),
        }
    }

    /// Wire type of the payload.
    pub fn message_type(&self) -> MessageType {
        match self {
            TrailPayload::FindSuccessor(_) => MessageType::FindSuccessor,
            TrailPayload::PeerGet(_) => MessageType::PeerGet,
            TrailPayload::PeerPut(_) => MessageType::PeerPut,
            TrailPayload::PeerGetResult(_) => MessageType::PeerGetResult,
        }
    }
}
