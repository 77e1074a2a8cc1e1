//! `reliable-udp` — stop-and-wait segment delivery over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   DATA segments   ┌──────────┐
//!  │  Sender  │──────────────────▶│  Server  │
//!  └────┬─────┘                   └─────┬────┘
//!       │                               │ validate
//!       │        ACK / REJECT      ┌────▼─────┐
//!       │◀─────────────────────────│ Receiver │
//!       │                          └──────────┘
//!  ┌────▼──────────────────────────────┐
//!  │       Channel (send / recv)       │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]     — wire format (serialise / deserialise)
//! - [`fault`]      — deliberate corruption of outbound segments
//! - [`receiver`]   — inbound validation and the expected-sequence counter
//! - [`sender`]     — stop-and-wait retransmission state machine
//! - [`state`]      — per-segment sender states
//! - [`server`]     — receive loop answering each datagram
//! - [`config`]     — run parameters with reference defaults
//! - [`channel`]    — datagram transport trait and UDP binding
//! - [`simulator`]  — optional lossy channel wrapper for testing

pub mod channel;
pub mod config;
pub mod fault;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod simulator;
pub mod state;

pub use channel::{Channel, ChannelError, Socket};
pub use config::{ReceiverConfig, SenderConfig};
pub use packet::{DataSegment, PacketError, RejectCode, Response};
pub use receiver::{validate, Receiver, Verdict};
pub use sender::{AttemptOutcome, RunReport, SendError, Sender, Session};
pub use server::Server;
