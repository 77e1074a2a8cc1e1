//! Inbound segment validation and sequencing.
//!
//! The [`Receiver`] holds a single counter, the next expected sequence
//! number.  Each decoded [`DataSegment`] is judged by [`validate`] and, on
//! acceptance only, the counter advances by one.  Nothing is buffered:
//! segments that arrive early are rejected and must be sent again.
//!
//! # Rule order
//!
//! Checks run in a fixed priority and the first failing rule decides:
//!
//! 1. start marker wrong → [`Verdict::Drop`] (not this protocol, no answer)
//! 2. end marker wrong   → reject [`RejectCode::EndMissing`]
//! 3. `seq < expected`   → reject [`RejectCode::Duplicate`]
//! 4. `seq > expected`   → reject [`RejectCode::OutOfSequence`]
//! 5. declared length ≠ payload bytes → reject [`RejectCode::LengthMismatch`]
//! 6. otherwise          → [`Verdict::Accept`]
//!
//! Sequence checks precede the length check, so a segment wrong in both is
//! always reported as a sequencing error.
//!
//! The [`Receiver`] does **not** touch the socket; [`crate::server::Server`]
//! feeds it datagrams and sends whatever response it produces.

use std::cmp::Ordering;

use crate::packet::{DataSegment, RejectCode, Response, END_MARKER, START_MARKER};

/// Outcome of validating one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectCode),
    /// Silently ignored; no response is sent.
    Drop,
}

/// Judge `segment` against `expected_seq` without changing any state.
///
/// `expected_seq` is wider than the wire field: once it passes
/// `u16::MAX` every segment compares as a duplicate.
pub fn validate(expected_seq: u32, segment: &DataSegment) -> Verdict {
    if segment.start != START_MARKER {
        return Verdict::Drop;
    }
    if segment.end != END_MARKER {
        return Verdict::Reject(RejectCode::EndMissing);
    }
    match u32::from(segment.seq).cmp(&expected_seq) {
        Ordering::Less => return Verdict::Reject(RejectCode::Duplicate),
        Ordering::Greater => return Verdict::Reject(RejectCode::OutOfSequence),
        Ordering::Equal => {}
    }
    if usize::from(segment.length) != segment.payload.len() {
        return Verdict::Reject(RejectCode::LengthMismatch);
    }
    Verdict::Accept
}

/// First sequence number of every stream.
pub const INITIAL_SEQ: u16 = 1;

/// Receive-side state: the next sequence number that will be accepted.
///
/// Lives for the whole process; it never resets and never moves backwards.
/// After segment `u16::MAX` is accepted the stream is exhausted and the
/// counter stays at `u16::MAX + 1`.
#[derive(Debug)]
pub struct Receiver {
    expected_seq: u32,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            expected_seq: u32::from(INITIAL_SEQ),
        }
    }

    /// Next sequence number that would be accepted.
    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    /// Validate `segment` and advance the counter when it is accepted.
    pub fn on_segment(&mut self, segment: &DataSegment) -> Verdict {
        let verdict = validate(self.expected_seq, segment);
        match verdict {
            Verdict::Accept => {
                log::info!("valid packet received: segment {}", segment.seq);
                // Cannot overflow: no u16 seq is accepted past u16::MAX + 1.
                self.expected_seq += 1;
            }
            Verdict::Reject(code) => {
                log::warn!("segment {} rejected: {code}", segment.seq);
            }
            Verdict::Drop => {
                log::warn!("invalid start of packet identifier 0x{:04X}", segment.start);
            }
        }
        verdict
    }

    /// Like [`on_segment`](Self::on_segment), but returns the frame to send
    /// back, or `None` when the segment is dropped.
    ///
    /// Responses echo the segment's sender id and sequence number as received.
    pub fn respond(&mut self, segment: &DataSegment) -> Option<Response> {
        let sender_id = segment.sender_id;
        let seq = segment.seq;
        match self.on_segment(segment) {
            Verdict::Accept => Some(Response::Ack { sender_id, seq }),
            Verdict::Reject(code) => Some(Response::Reject {
                sender_id,
                seq,
                code,
            }),
            Verdict::Drop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn seg(seq: u16) -> DataSegment {
        DataSegment::new(1, seq, format!("Data for packet {seq}").into_bytes()).unwrap()
    }

    fn receiver_at(expected: u32) -> Receiver {
        Receiver {
            expected_seq: expected,
        }
    }

    #[test]
    fn first_segment_is_acked_and_advances() {
        let mut rx = Receiver::new();
        assert_eq!(
            rx.respond(&seg(1)),
            Some(Response::Ack { sender_id: 1, seq: 1 })
        );
        assert_eq!(rx.expected_seq(), 2);
    }

    #[test]
    fn early_segment_is_out_of_sequence() {
        let mut rx = Receiver::new();
        assert_eq!(
            rx.respond(&seg(2)),
            Some(Response::Reject {
                sender_id: 1,
                seq: 2,
                code: RejectCode::OutOfSequence
            })
        );
        assert_eq!(rx.expected_seq(), 1);
    }

    #[test]
    fn old_segment_is_duplicate() {
        let mut rx = receiver_at(3);
        assert_eq!(
            rx.respond(&seg(2)),
            Some(Response::Reject {
                sender_id: 1,
                seq: 2,
                code: RejectCode::Duplicate
            })
        );
        assert_eq!(rx.expected_seq(), 3);
    }

    #[test]
    fn declared_length_must_match_payload() {
        let mut s = DataSegment::new(1, 1, vec![b'x'; 15]).unwrap();
        s.length = 20;
        assert_eq!(validate(1, &s), Verdict::Reject(RejectCode::LengthMismatch));
    }

    #[test]
    fn bad_start_marker_is_dropped_without_response() {
        let mut rx = Receiver::new();
        let mut s = seg(1);
        s.start = 0x0000;
        s.end = 0x0000;
        assert_eq!(rx.respond(&s), None);
        assert_eq!(rx.expected_seq(), 1);
    }

    #[test]
    fn end_marker_checked_before_sequence() {
        let mut s = seg(9);
        s.end = 0xFFF0;
        assert_eq!(validate(1, &s), Verdict::Reject(RejectCode::EndMissing));
    }

    #[test]
    fn end_missing_echoes_seq_as_received() {
        let mut rx = receiver_at(4);
        let mut s = seg(4);
        s.end = 0xFFF0;
        assert_eq!(
            rx.respond(&s),
            Some(Response::Reject {
                sender_id: 1,
                seq: 4,
                code: RejectCode::EndMissing
            })
        );
        assert_eq!(rx.expected_seq(), 4);
    }

    #[test]
    fn sequence_errors_win_over_length_errors() {
        let mut s = seg(5);
        s.length = s.length.wrapping_add(5);
        assert_eq!(validate(3, &s), Verdict::Reject(RejectCode::OutOfSequence));
        assert_eq!(validate(7, &s), Verdict::Reject(RejectCode::Duplicate));
        assert_eq!(validate(5, &s), Verdict::Reject(RejectCode::LengthMismatch));
    }

    #[test]
    fn echoes_sender_id() {
        let mut rx = Receiver::new();
        let s = DataSegment::new(42, 1, b"hi".to_vec()).unwrap();
        assert_eq!(
            rx.respond(&s),
            Some(Response::Ack { sender_id: 42, seq: 1 })
        );
    }

    #[test]
    fn duplicates_never_advance() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let expected: u16 = rng.random_range(2..=u16::MAX);
            let seq: u16 = rng.random_range(0..expected);
            let mut rx = receiver_at(u32::from(expected));
            for _ in 0..3 {
                assert_eq!(
                    rx.on_segment(&seg(seq)),
                    Verdict::Reject(RejectCode::Duplicate)
                );
            }
            assert_eq!(rx.expected_seq(), u32::from(expected));
        }
    }

    #[test]
    fn counter_moves_by_one_only_on_accept() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut rx = Receiver::new();
        for _ in 0..500 {
            let before = rx.expected_seq();
            let base = u16::try_from(before).unwrap();
            let seq = base.wrapping_add(rng.random_range(0..3)).wrapping_sub(1);
            let verdict = rx.on_segment(&seg(seq));
            if verdict == Verdict::Accept {
                assert_eq!(rx.expected_seq(), before + 1);
            } else {
                assert_eq!(rx.expected_seq(), before);
            }
        }
        assert!(rx.expected_seq() > u32::from(INITIAL_SEQ));
    }

    #[test]
    fn counter_does_not_wrap_past_last_sequence_number() {
        let mut rx = Receiver::new();
        for seq in INITIAL_SEQ..=u16::MAX {
            assert_eq!(rx.on_segment(&seg(seq)), Verdict::Accept);
        }
        let exhausted = u32::from(u16::MAX) + 1;
        assert_eq!(rx.expected_seq(), exhausted);

        for seq in [0, 1, 2, u16::MAX / 2, u16::MAX] {
            assert_eq!(
                rx.on_segment(&seg(seq)),
                Verdict::Reject(RejectCode::Duplicate)
            );
            assert_eq!(rx.expected_seq(), exhausted);
        }
    }

    #[test]
    fn reference_fault_rotation_hits_every_reject_path() {
        use crate::fault::{corrupt, Fault};

        let mut rx = Receiver::new();
        assert_eq!(rx.on_segment(&seg(1)), Verdict::Accept);
        for (i, seq) in (2..=5).enumerate() {
            let bad = corrupt(&seg(seq), i);
            assert_eq!(
                rx.on_segment(&bad),
                Verdict::Reject(Fault::from_index(i).expected_reject())
            );
            assert_eq!(rx.on_segment(&seg(seq)), Verdict::Accept);
        }
        assert_eq!(rx.expected_seq(), 6);
    }
}
