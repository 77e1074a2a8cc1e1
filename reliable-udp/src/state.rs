//! Per-segment sender states.
//!
//! Transitions are driven by [`crate::sender::Sender::send_segment`]:
//!
//! ```text
//!  Building ──▶ Transmitted ──ACK(seq)──▶ Acked
//!     ▲              │
//!     │              │ reject / bad ACK / garbage / timeout
//!     │              ▼
//!     └──────── RetryPending ──retries exhausted──▶ Aborted
//! ```
//!
//! `Acked` and `Aborted` are terminal for a segment.  An `Aborted` segment
//! also ends the whole run.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    /// Frame for the current attempt is being assembled.
    #[default]
    Building,
    /// Frame is on the wire; waiting for a response.
    Transmitted,
    /// Matching ACK received.
    Acked,
    /// Last attempt failed and another one is allowed.
    RetryPending,
    /// Retries exhausted without an ACK.
    Aborted,
}

impl std::fmt::Display for SegmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
