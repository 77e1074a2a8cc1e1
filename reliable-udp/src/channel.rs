//! Datagram channel abstraction.
//!
//! Protocol code only needs two operations from the transport: send one
//! whole datagram, and receive one whole datagram with an optional bound on
//! the wait.  [`Channel`] captures exactly that; [`Socket`] is the
//! production binding over `tokio::net::UdpSocket`.  Tests substitute
//! in-memory channels or wrap a socket in [`crate::simulator::Simulator`].

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

/// Receive buffer size (theoretical UDP limit; frames are far smaller).
const MAX_DATAGRAM: usize = 65_535;

/// Errors that can arise from channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Nothing arrived within the requested bound.
    #[error("timed out waiting for a datagram")]
    Timeout,
    /// The channel itself failed; retrying will not help.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An unreliable, message-oriented transport.
///
/// Each call moves exactly one datagram; there is no partial delivery.
pub trait Channel: Send + Sync {
    /// Send `bytes` as a single datagram to `dest`.
    fn send_to(
        &self,
        bytes: &[u8],
        dest: SocketAddr,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next datagram.
    ///
    /// `None` waits forever; `Some(limit)` fails with
    /// [`ChannelError::Timeout`] once `limit` has elapsed.
    fn recv_from(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(Vec<u8>, SocketAddr), ChannelError>> + Send;
}

/// A UDP socket speaking raw datagrams.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, ChannelError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }
}

impl Channel for Socket {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), ChannelError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    async fn recv_from(
        &self,
        timeout: Option<Duration>,
    ) -> Result<(Vec<u8>, SocketAddr), ChannelError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.recv_from(&mut buf))
                .await
                .map_err(|_elapsed| ChannelError::Timeout)??,
            None => self.inner.recv_from(&mut buf).await?,
        };
        buf.truncate(n);
        Ok((buf, addr))
    }
}
