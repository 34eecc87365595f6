//! Message framing: the size+type header shared by all routing messages.

use super::ProtocolError;
use crate::identity::{HASH_SIZE, PEER_ID_SIZE};
use crate::{HashCode, PeerId};
use std::fmt;

/// Size of the message header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest frame representable by the 16-bit size field.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Routing message type identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    /// Random walk step toward a finger location.
    WalkInit = 910,
    /// Walk result travelling back to the initiator.
    WalkResponse = 911,
    /// Tear down one side of a trail.
    TrailDestroy = 912,
    /// Payload routed along an existing trail.
    TrailRoute = 913,
    /// Ask the end of a trail for entries following a key.
    FindSuccessor = 914,
    /// Data lookup.
    PeerGet = 915,
    /// Data store.
    PeerPut = 916,
    /// Answer to a data lookup.
    PeerGetResult = 917,
}

impl MessageType {
    /// Try to convert from the wire value.
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            910 => Some(MessageType::WalkInit),
            911 => Some(MessageType::WalkResponse),
            912 => Some(MessageType::TrailDestroy),
            913 => Some(MessageType::TrailRoute),
            914 => Some(MessageType::FindSuccessor),
            915 => Some(MessageType::PeerGet),
            916 => Some(MessageType::PeerPut),
            917 => Some(MessageType::PeerGetResult),
            _ => None,
        }
    }

    /// Convert to the wire value.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Exact frame size for fixed-size messages, `None` for variable ones.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            MessageType::WalkInit => Some(super::WalkInit::SIZE),
            MessageType::WalkResponse => Some(super::WalkResponse::SIZE),
            MessageType::TrailDestroy => Some(super::TrailDestroy::SIZE),
            MessageType::FindSuccessor => Some(super::FindSuccessor::SIZE),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::WalkInit => "WalkInit",
            MessageType::WalkResponse => "WalkResponse",
            MessageType::TrailDestroy => "TrailDestroy",
            MessageType::TrailRoute => "TrailRoute",
            MessageType::FindSuccessor => "FindSuccessor",
            MessageType::PeerGet => "PeerGet",
            MessageType::PeerPut => "PeerPut",
            MessageType::PeerGetResult => "PeerGetResult",
        };
        write!(f, "{}", name)
    }
}

/// Message header: `[size:2 BE][type:2 BE]`, size includes the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total frame size in bytes.
    pub size: u16,
    /// Raw message type.
    pub msg_type: u16,
}

impl MessageHeader {
    /// Build a header for a frame of `size` bytes.
    pub fn new(msg_type: MessageType, size: usize) -> Self {
        Self {
            size: size as u16,
            msg_type: msg_type.to_u16(),
        }
    }

    /// Append the header to `buf`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.size.to_be_bytes());
        buf.extend_from_slice(&self.msg_type.to_be_bytes());
    }

    /// Parse the header at the start of `frame`.
    pub fn parse(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_SIZE {
            return Err(ProtocolError::MessageTooShort {
                expected: HEADER_SIZE,
                got: frame.len(),
            });
        }
        Ok(Self {
            size: u16::from_be_bytes([frame[0], frame[1]]),
            msg_type: u16::from_be_bytes([frame[2], frame[3]]),
        })
    }

    /// Parse the header and check that it describes exactly `frame`.
    pub fn parse_exact(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = Self::parse(frame)?;
        if header.size as usize != frame.len() {
            return Err(ProtocolError::SizeMismatch {
                declared: header.size as usize,
                actual: frame.len(),
            });
        }
        Ok(header)
    }

    /// The typed message type, if known.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u16(self.msg_type)
    }
}

/// Start a frame, reserving room for the header.
pub(crate) fn begin_frame(capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(capacity);
    buf.extend_from_slice(&[0u8; HEADER_SIZE]);
    buf
}

/// Fill in the header of a frame built by [`begin_frame`].
pub(crate) fn finish_frame(msg_type: MessageType, mut buf: Vec<u8>) -> Vec<u8> {
    let header = MessageHeader::new(msg_type, buf.len());
    buf[0..2].copy_from_slice(&header.size.to_be_bytes());
    buf[2..4].copy_from_slice(&header.msg_type.to_be_bytes());
    buf
}

/// Bounds-checked cursor over a message body.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.buf.len() < self.pos + n {
            return Err(ProtocolError::MessageTooShort {
                expected: self.pos + n,
                got: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ProtocolError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    pub(crate) fn hash(&mut self) -> Result<HashCode, ProtocolError> {
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(self.take(HASH_SIZE)?);
        Ok(HashCode::from_bytes(bytes))
    }

    pub(crate) fn peer_path(&mut self, len: usize) -> Result<Vec<PeerId>, ProtocolError> {
        let raw = self.take(len * PEER_ID_SIZE)?;
        Ok(raw
            .chunks_exact(PEER_ID_SIZE)
            .map(|c| {
                let mut bytes = [0u8; PEER_ID_SIZE];
                bytes.copy_from_slice(c);
                PeerId::from_bytes(bytes)
            })
            .collect())
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail if unread bytes remain.
    pub(crate) fn finish(&self) -> Result<(), ProtocolError> {
        if self.remaining() != 0 {
            return Err(ProtocolError::Malformed(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Parse `frame` as a message of type `expected` and return a reader over its body.
///
/// Checks that the header size matches the frame and, for fixed-size types,
/// that the frame has exactly the size of that type.
pub(crate) fn open_frame(frame: &[u8], expected: MessageType) -> Result<Reader<'_>, ProtocolError> {
    let header = MessageHeader::parse_exact(frame)?;
    if header.msg_type != expected.to_u16() {
        return Err(ProtocolError::InvalidMessageType(header.msg_type));
    }
    if let Some(size) = expected.fixed_size()
        && frame.len() != size
    {
        return Err(ProtocolError::WrongFixedSize {
            msg_type: expected.to_u16(),
            expected: size,
            got: frame.len(),
        });
    }
    Ok(Reader::new(&frame[HEADER_SIZE..]))
}
