//! Wire-format definitions for data segments and their responses.
//!
//! Three frame kinds travel between the peers:
//! - [`DataSegment`] — sender → receiver, one numbered unit of payload.
//! - [`Response::Ack`] — receiver → sender, segment accepted.
//! - [`Response::Reject`] — receiver → sender, segment refused with a
//!   [`RejectCode`].
//!
//! This module is the only place that knows field offsets and sizes.  No I/O
//! happens here; every read is bounds-checked and a short or unrecognised
//! buffer yields a [`PacketError`] instead of a partial frame.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.  Fields are packed with no
//! padding.
//!
//! ```text
//! Data:    START(2) | sender_id(1) | DATA(2)   | seq(2) | length(1) | payload(..) | END(2)
//! Ack:     START(2) | sender_id(1) | ACK(2)    | seq(2) | END(2)
//! Reject:  START(2) | sender_id(1) | REJECT(2) | seq(2) | code(2)   | END(2)
//! ```
//!
//! A data frame's payload is everything between the 8-byte header and the
//! trailing end marker.  The declared `length` is carried separately and is
//! *not* used to slice the buffer, so a frame that lies about its length
//! still decodes and can be rejected by the receiver.

use thiserror::Error;

/// Start-of-packet marker shared by every frame kind.
pub const START_MARKER: u16 = 0xFFFF;
/// End-of-packet marker shared by every frame kind.
pub const END_MARKER: u16 = 0xFFFF;

/// Packet-type tags.
pub mod tag {
    pub const DATA: u16 = 0xFFF1;
    pub const ACK: u16 = 0xFFF2;
    pub const REJECT: u16 = 0xFFF3;
}

/// Largest payload a data frame can carry (the length field is one byte).
pub const MAX_PAYLOAD: usize = 255;

// Shared header offsets.
const OFF_START: usize = 0;
const OFF_SENDER: usize = 2;
const OFF_TYPE: usize = 3;
const OFF_SEQ: usize = 5;

// Data-only offsets.
const OFF_LENGTH: usize = 7;
const OFF_PAYLOAD: usize = 8;

// Reject-only offset.
const OFF_CODE: usize = 7;

/// Size of the end marker trailing every frame.
const END_LEN: usize = 2;

/// Smallest well-formed data frame (empty payload).
pub const DATA_MIN_LEN: usize = OFF_PAYLOAD + END_LEN;
/// Largest data frame on the wire.
pub const DATA_MAX_LEN: usize = DATA_MIN_LEN + MAX_PAYLOAD;
/// Exact size of an ACK frame.
pub const ACK_LEN: usize = OFF_SEQ + 2 + END_LEN;
/// Exact size of a REJECT frame.
pub const REJECT_LEN: usize = OFF_CODE + 2 + END_LEN;

/// Reason a receiver refused a data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectCode {
    OutOfSequence,
    LengthMismatch,
    EndMissing,
    Duplicate,
}

impl RejectCode {
    /// All sub-codes in wire-value order.
    pub const ALL: [RejectCode; 4] = [
        RejectCode::OutOfSequence,
        RejectCode::LengthMismatch,
        RejectCode::EndMissing,
        RejectCode::Duplicate,
    ];

    /// The 16-bit value carried on the wire.
    pub fn to_wire(self) -> u16 {
        match self {
            RejectCode::OutOfSequence => 0xFFF4,
            RejectCode::LengthMismatch => 0xFFF5,
            RejectCode::EndMissing => 0xFFF6,
            RejectCode::Duplicate => 0xFFF7,
        }
    }

    /// Parse a wire value, `None` when it names no known sub-code.
    pub fn from_wire(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.to_wire() == value)
    }
}

impl std::fmt::Display for RejectCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RejectCode::OutOfSequence => "out of sequence",
            RejectCode::LengthMismatch => "length mismatch",
            RejectCode::EndMissing => "end marker missing",
            RejectCode::Duplicate => "duplicate",
        };
        write!(f, "{name} (0x{:X})", self.to_wire())
    }
}

/// One data segment as seen on the wire.
///
/// Every field is stored exactly as transmitted, including the markers and
/// the declared `length`, so a deliberately malformed segment survives a
/// round trip through the codec unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub start: u16,
    pub sender_id: u8,
    pub seq: u16,
    /// Declared payload length.  Well-formed segments have
    /// `length == payload.len()`.
    pub length: u8,
    pub payload: Vec<u8>,
    pub end: u16,
}

impl DataSegment {
    /// Build a well-formed segment: valid markers and a truthful length.
    ///
    /// Fails with [`PacketError::PayloadTooLarge`] when `payload` exceeds
    /// [`MAX_PAYLOAD`].
    pub fn new(sender_id: u8, seq: u16, payload: Vec<u8>) -> Result<Self, PacketError> {
        let length = u8::try_from(payload.len())
            .map_err(|_| PacketError::PayloadTooLarge(payload.len()))?;
        Ok(Self {
            start: START_MARKER,
            sender_id,
            seq,
            length,
            payload,
            end: END_MARKER,
        })
    }

    /// Serialise into a newly allocated buffer.
    ///
    /// Fields are written verbatim; nothing is recomputed from the payload.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(self.payload.len()));
        }
        let mut buf = Vec::with_capacity(DATA_MIN_LEN + self.payload.len());
        buf.extend_from_slice(&self.start.to_be_bytes());
        buf.push(self.sender_id);
        buf.extend_from_slice(&tag::DATA.to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.push(self.length);
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.end.to_be_bytes());
        Ok(buf)
    }

    /// Parse a data frame.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`DATA_MIN_LEN`] or longer than [`DATA_MAX_LEN`],
    /// - the type field is not [`tag::DATA`].
    ///
    /// Marker values are returned as found; judging them is the receiver's job.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < DATA_MIN_LEN {
            return Err(PacketError::Truncated {
                needed: DATA_MIN_LEN,
                got: buf.len(),
            });
        }
        if buf.len() > DATA_MAX_LEN {
            return Err(PacketError::PayloadTooLarge(buf.len() - DATA_MIN_LEN));
        }

        let kind = read_u16(buf, OFF_TYPE)?;
        if kind != tag::DATA {
            return Err(PacketError::UnknownType(kind));
        }

        let end_at = buf.len() - END_LEN;
        Ok(Self {
            start: read_u16(buf, OFF_START)?,
            sender_id: buf[OFF_SENDER],
            seq: read_u16(buf, OFF_SEQ)?,
            length: buf[OFF_LENGTH],
            payload: buf[OFF_PAYLOAD..end_at].to_vec(),
            end: read_u16(buf, end_at)?,
        })
    }
}

/// A receiver's answer to one data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ack {
        sender_id: u8,
        seq: u16,
    },
    Reject {
        sender_id: u8,
        seq: u16,
        code: RejectCode,
    },
}

impl Response {
    /// Sequence number the response refers to.
    pub fn seq(&self) -> u16 {
        match *self {
            Response::Ack { seq, .. } | Response::Reject { seq, .. } => seq,
        }
    }

    /// Serialise into a newly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Response::Ack { sender_id, seq } => encode_ack(sender_id, seq),
            Response::Reject {
                sender_id,
                seq,
                code,
            } => encode_reject(sender_id, seq, code),
        }
    }

    /// Parse an ACK or REJECT frame.
    ///
    /// Unlike data frames, responses are checked for both markers here: a
    /// response has no later validation stage.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < ACK_LEN {
            return Err(PacketError::Truncated {
                needed: ACK_LEN,
                got: buf.len(),
            });
        }

        let sender_id = buf[OFF_SENDER];
        let seq = read_u16(buf, OFF_SEQ)?;
        let kind = read_u16(buf, OFF_TYPE)?;
        let (response, frame_len) = match kind {
            tag::ACK => (Response::Ack { sender_id, seq }, ACK_LEN),
            tag::REJECT => {
                let raw = read_u16(buf, OFF_CODE)?;
                let code = RejectCode::from_wire(raw).ok_or(PacketError::UnknownRejectCode(raw))?;
                (
                    Response::Reject {
                        sender_id,
                        seq,
                        code,
                    },
                    REJECT_LEN,
                )
            }
            other => return Err(PacketError::UnknownType(other)),
        };

        if buf.len() < frame_len {
            return Err(PacketError::Truncated {
                needed: frame_len,
                got: buf.len(),
            });
        }
        if read_u16(buf, OFF_START)? != START_MARKER || read_u16(buf, frame_len - END_LEN)? != END_MARKER
        {
            return Err(PacketError::BadMarker);
        }

        Ok(response)
    }
}

/// Encode an ACK frame for `seq`.
pub fn encode_ack(sender_id: u8, seq: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ACK_LEN);
    buf.extend_from_slice(&START_MARKER.to_be_bytes());
    buf.push(sender_id);
    buf.extend_from_slice(&tag::ACK.to_be_bytes());
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&END_MARKER.to_be_bytes());
    buf
}

/// Encode a REJECT frame for `seq` carrying `code`.
pub fn encode_reject(sender_id: u8, seq: u16, code: RejectCode) -> Vec<u8> {
    let mut buf = Vec::with_capacity(REJECT_LEN);
    buf.extend_from_slice(&START_MARKER.to_be_bytes());
    buf.push(sender_id);
    buf.extend_from_slice(&tag::REJECT.to_be_bytes());
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&code.to_wire().to_be_bytes());
    buf.extend_from_slice(&END_MARKER.to_be_bytes());
    buf
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, PacketError> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(PacketError::Truncated {
            needed: offset + 2,
            got: buf.len(),
        })
}

/// Errors that can arise when building or parsing a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("frame too short: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unknown packet type 0x{0:04X}")]
    UnknownType(u16),
    #[error("unknown reject sub-code 0x{0:04X}")]
    UnknownRejectCode(u16),
    #[error("start or end marker missing")]
    BadMarker,
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD}-byte limit")]
    PayloadTooLarge(usize),
}
