//! Receive loop: datagrams in, ACK/REJECT frames out.
//!
//! One datagram is processed at a time.  Frames that do not decode as data
//! segments, and segments whose start marker is wrong, are not this
//! protocol's traffic and get no response at all.

use std::net::SocketAddr;

use crate::channel::{Channel, ChannelError, Socket};
use crate::config::ReceiverConfig;
use crate::packet::{DataSegment, PacketError, Response};
use crate::receiver::Receiver;

/// What [`Server::serve_one`] did with a datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// A response was sent back to `to`.
    Answered { response: Response, to: SocketAddr },
    /// The datagram was not a data frame.
    Undecodable(PacketError),
    /// The frame carried a foreign start marker.
    Dropped,
}

/// A receiving endpoint bound to one channel.
#[derive(Debug)]
pub struct Server<C> {
    channel: C,
    receiver: Receiver,
}

impl Server<Socket> {
    /// Bind a UDP socket per `config` and wrap it.
    pub async fn bind(config: &ReceiverConfig) -> Result<Self, ChannelError> {
        let socket = Socket::bind(config.bind).await?;
        log::info!("server is running on {}", socket.local_addr);
        Ok(Self::new(socket))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.channel.local_addr
    }
}

impl<C: Channel> Server<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            receiver: Receiver::new(),
        }
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Wait for one datagram (without a time bound) and handle it.
    ///
    /// Receive and send failures are returned; the receiver state has
    /// already been updated when a response fails to go out.
    pub async fn serve_one(&mut self) -> Result<Handled, ChannelError> {
        let (bytes, from) = self.channel.recv_from(None).await?;

        let segment = match DataSegment::decode(&bytes) {
            Ok(segment) => segment,
            Err(e) => {
                log::warn!("dropping {} byte datagram from {from}: {e}", bytes.len());
                return Ok(Handled::Undecodable(e));
            }
        };

        let Some(response) = self.receiver.respond(&segment) else {
            return Ok(Handled::Dropped);
        };

        self.channel.send_to(&response.encode(), from).await?;
        match response {
            Response::Ack { seq, .. } => log::debug!("ACK sent for segment {seq}"),
            Response::Reject { seq, code, .. } => {
                log::debug!("REJECT sent for segment {seq} with sub-code {code}")
            }
        }
        Ok(Handled::Answered { response, to: from })
    }

    /// Serve forever.  Channel failures are logged and the loop carries on.
    pub async fn run(&mut self) {
        loop {
            if let Err(e) = self.serve_one().await {
                log::error!("failed to handle datagram: {e}");
            }
        }
    }
}
