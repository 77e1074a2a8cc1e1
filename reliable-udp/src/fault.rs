//! Deliberate segment corruption for exercising the receiver's reject paths.
//!
//! | `fault_index % 4` | mutation                         | expected verdict  |
//! |-------------------|----------------------------------|-------------------|
//! | 0                 | `seq += 1`                       | out of sequence   |
//! | 1                 | declared `length += 5`           | length mismatch   |
//! | 2                 | end marker → [`CORRUPT_END`]     | end missing       |
//! | 3                 | `seq -= 1`                       | duplicate         |
//!
//! Everything here is pure: the same segment and index always produce the
//! same output.

use crate::packet::{DataSegment, RejectCode, END_MARKER};

/// End-marker value written by [`Fault::EndMissing`].
pub const CORRUPT_END: u16 = 0xFFF0;

const _: () = assert!(CORRUPT_END != END_MARKER);

/// One of the four malformations the injector can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    OutOfSequence,
    LengthMismatch,
    EndMissing,
    Duplicate,
}

impl Fault {
    /// Map a rotating selector onto a fault; total over every `usize`.
    pub fn from_index(fault_index: usize) -> Self {
        match fault_index % 4 {
            0 => Fault::OutOfSequence,
            1 => Fault::LengthMismatch,
            2 => Fault::EndMissing,
            _ => Fault::Duplicate,
        }
    }

    /// Reject sub-code a receiver is expected to answer with.
    ///
    /// [`Fault::Duplicate`] only produces a duplicate verdict once the
    /// preceding segment has been accepted.
    pub fn expected_reject(self) -> RejectCode {
        match self {
            Fault::OutOfSequence => RejectCode::OutOfSequence,
            Fault::LengthMismatch => RejectCode::LengthMismatch,
            Fault::EndMissing => RejectCode::EndMissing,
            Fault::Duplicate => RejectCode::Duplicate,
        }
    }

    /// Apply this fault to a copy of `segment`.
    pub fn apply(self, segment: &DataSegment) -> DataSegment {
        let mut out = segment.clone();
        match self {
            Fault::OutOfSequence => out.seq = out.seq.wrapping_add(1),
            // Payload bytes are left untouched.
            Fault::LengthMismatch => out.length = out.length.wrapping_add(5),
            Fault::EndMissing => out.end = CORRUPT_END,
            Fault::Duplicate => out.seq = out.seq.wrapping_sub(1),
        }
        out
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::OutOfSequence => write!(f, "out-of-sequence"),
            Fault::LengthMismatch => write!(f, "length mismatch"),
            Fault::EndMissing => write!(f, "missing end identifier"),
            Fault::Duplicate => write!(f, "duplicate packet"),
        }
    }
}

/// Corrupt `segment` with the fault selected by `fault_index % 4`.
pub fn corrupt(segment: &DataSegment, fault_index: usize) -> DataSegment {
    let fault = Fault::from_index(fault_index);
    let out = fault.apply(segment);
    log::debug!("simulating {fault} error for packet {}", out.seq);
    out
}
