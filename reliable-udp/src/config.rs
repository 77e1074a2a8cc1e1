//! Run parameters for both endpoints.
//!
//! Defaults reproduce the reference scenario: five segments to
//! `127.0.0.1:8080`, a 3 s wait per attempt and at most three attempts per
//! segment.  `main.rs` overrides any of them from the command line.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Well-known port of the receiving endpoint.
pub const DEFAULT_PORT: u16 = 8080;

/// Sender-side parameters.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Where data segments are sent.
    pub destination: SocketAddr,
    /// Number of segments in the run; sequence numbers run `1..=segments`.
    pub segments: u16,
    /// How long each attempt waits for a response.
    pub ack_timeout: Duration,
    /// Attempts allowed per segment before the run is aborted.
    pub max_retries: u32,
    /// Session identifier written into every data segment.
    pub sender_id: u8,
    /// Corrupt the first attempt of every segment after the first.
    pub inject_faults: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            destination: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            segments: 5,
            ack_timeout: Duration::from_millis(3000),
            max_retries: 3,
            sender_id: 1,
            inject_faults: true,
        }
    }
}

/// Receiver-side parameters.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local address the receiver listens on.
    pub bind: SocketAddr,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
        }
    }
}
