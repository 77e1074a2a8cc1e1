//! Outbound stop-and-wait state machine.
//!
//! [`Sender`] pushes segments `1..=N` through a [`Channel`] one at a time:
//! build the frame, optionally corrupt it, transmit, then block for a
//! bounded time on the single response.  Only a matching ACK completes a
//! segment; a REJECT, an ACK for another sequence number, an undecodable
//! reply or a timeout all cost one attempt.
//!
//! # Stop-and-Wait contract
//! - At most **one** segment is in flight at any moment.
//! - A segment gets at most `max_retries` attempts.  When the last one
//!   fails the whole run stops; later segments are never sent.
//! - Transport failures end the run immediately and are never retried.
//! - Replies count only when they come from the configured destination;
//!   a datagram from any other address costs an attempt.
//!
//! # Fault injection
//! With `inject_faults` on, the *first* attempt of every segment after the
//! first is corrupted by [`crate::fault::corrupt`] using the session's
//! rotating selector, which advances once per segment.  Retries of that
//! segment go out clean.

use std::net::SocketAddr;

use thiserror::Error;

use crate::channel::{Channel, ChannelError};
use crate::config::SenderConfig;
use crate::fault::corrupt;
use crate::packet::{DataSegment, PacketError, RejectCode, Response};
use crate::receiver::INITIAL_SEQ;
use crate::state::SegmentState;

/// Deterministic payload carried by segment `seq`.
pub fn payload_for(seq: u16) -> Vec<u8> {
    format!("Data for packet {seq}").into_bytes()
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable state of one run, threaded through [`Sender::send_segment`].
#[derive(Debug, Default)]
pub struct Session {
    /// Segment currently being delivered.
    pub seq: u16,
    /// Failed attempts for the current segment.
    pub retries: u32,
    /// Rotating fault selector; advanced once per corrupted segment.
    pub fault_index: usize,
    /// Where the current segment is in its lifecycle.
    pub state: SegmentState,
    /// Segments acknowledged so far.
    pub delivered: u16,
    /// Data frames put on the wire so far, retries included.
    pub transmissions: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, seq: u16) {
        self.seq = seq;
        self.retries = 0;
        self.state = SegmentState::Building;
    }

    /// Take the selector for this segment and rotate it.
    fn next_fault(&mut self) -> usize {
        let index = self.fault_index;
        self.fault_index = (self.fault_index + 1) % 4;
        index
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            delivered: self.delivered,
            transmissions: self.transmissions,
        }
    }
}

/// Summary of a run that delivered every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub delivered: u16,
    pub transmissions: u32,
}

/// What a single transmission attempt came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Acked,
    Rejected { seq: u16, code: RejectCode },
    /// ACK for a sequence number other than the one in flight.
    WrongAck(u16),
    /// Reply could not be decoded.
    Malformed(PacketError),
    /// Reply came from an address other than the destination.
    Foreign(SocketAddr),
    TimedOut,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::Acked => write!(f, "acknowledged"),
            AttemptOutcome::Rejected { seq, code } => write!(f, "segment {seq} rejected: {code}"),
            AttemptOutcome::WrongAck(seq) => write!(f, "ACK for segment {seq}"),
            AttemptOutcome::Malformed(e) => write!(f, "undecodable reply: {e}"),
            AttemptOutcome::Foreign(addr) => write!(f, "reply from unexpected address {addr}"),
            AttemptOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport failure: {0}")]
    Transport(#[from] ChannelError),
    #[error("cannot encode segment: {0}")]
    Encode(#[from] PacketError),
    #[error(
        "segment {seq} not acknowledged after {attempts} attempt(s); \
         {delivered} earlier segment(s) delivered; last attempt: {last}"
    )]
    Aborted {
        seq: u16,
        delivered: u16,
        attempts: u32,
        /// Why the final attempt failed.
        last: AttemptOutcome,
    },
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Drives a run of segments over channel `C`.
#[derive(Debug)]
pub struct Sender<C> {
    channel: C,
    config: SenderConfig,
}

impl<C: Channel> Sender<C> {
    pub fn new(channel: C, config: SenderConfig) -> Self {
        Self { channel, config }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Deliver segments `1..=segments` in order, stopping at the first
    /// segment that cannot be delivered.
    pub async fn run(&self) -> Result<RunReport, SendError> {
        let mut session = Session::new();
        self.run_with(&mut session).await
    }

    /// Same as [`run`](Self::run) but leaves the final state in `session`.
    pub async fn run_with(&self, session: &mut Session) -> Result<RunReport, SendError> {
        for seq in INITIAL_SEQ..=self.config.segments {
            self.send_segment(seq, session).await?;
        }
        log::info!(
            "run complete: {} segment(s) delivered in {} transmission(s)",
            session.delivered,
            session.transmissions
        );
        Ok(session.report())
    }

    /// Deliver one segment, retrying up to the configured limit.
    pub async fn send_segment(&self, seq: u16, session: &mut Session) -> Result<(), SendError> {
        session.begin(seq);
        let mut fault = (self.config.inject_faults && seq != INITIAL_SEQ)
            .then(|| session.next_fault());

        loop {
            session.state = SegmentState::Building;
            let clean = DataSegment::new(self.config.sender_id, seq, payload_for(seq))?;
            let segment = match fault.take() {
                Some(index) => corrupt(&clean, index),
                None => clean,
            };

            self.channel
                .send_to(&segment.encode()?, self.config.destination)
                .await?;
            session.transmissions += 1;
            session.state = SegmentState::Transmitted;
            log::info!("packet {seq} sent, waiting for ACK");

            let outcome = self.await_response(seq).await?;
            if outcome == AttemptOutcome::Acked {
                session.state = SegmentState::Acked;
                session.delivered += 1;
                return Ok(());
            }

            session.retries += 1;
            if session.retries >= self.config.max_retries {
                session.state = SegmentState::Aborted;
                log::error!("receiver does not respond to packet {seq}, aborting");
                return Err(SendError::Aborted {
                    seq,
                    delivered: session.delivered,
                    attempts: session.retries,
                    last: outcome,
                });
            }
            session.state = SegmentState::RetryPending;
            log::info!(
                "retrying packet {seq} ({}/{})",
                session.retries,
                self.config.max_retries
            );
        }
    }

    async fn await_response(&self, seq: u16) -> Result<AttemptOutcome, SendError> {
        let (bytes, from) = match self
            .channel
            .recv_from(Some(self.config.ack_timeout))
            .await
        {
            Ok(received) => received,
            Err(ChannelError::Timeout) => {
                log::warn!("ACK not received for packet {seq} (timeout)");
                return Ok(AttemptOutcome::TimedOut);
            }
            Err(e) => return Err(e.into()),
        };

        if from != self.config.destination {
            log::warn!("ignoring reply from {from}; expected {}", self.config.destination);
            return Ok(AttemptOutcome::Foreign(from));
        }

        let outcome = match Response::decode(&bytes) {
            Ok(Response::Ack { seq: acked, .. }) if acked == seq => {
                log::info!("ACK received for packet {seq}");
                AttemptOutcome::Acked
            }
            Ok(Response::Ack { seq: acked, .. }) => {
                log::warn!("ACK for packet {acked} while waiting on packet {seq}");
                AttemptOutcome::WrongAck(acked)
            }
            Ok(Response::Reject { seq: rejected, code, .. }) => {
                log::warn!("reject received for packet {rejected}, sub-code: {code}");
                AttemptOutcome::Rejected {
                    seq: rejected,
                    code,
                }
            }
            Err(e) => {
                log::warn!("undecodable response from {from}: {e}");
                AttemptOutcome::Malformed(e)
            }
        };
        Ok(outcome)
    }
}
