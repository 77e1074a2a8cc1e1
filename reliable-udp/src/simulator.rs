//! Lossy network simulator for reproducible retransmission tests.
//!
//! [`Simulator`] wraps any [`Channel`] and silently discards outbound
//! datagrams with probability `loss_rate`.  The RNG is seeded from the
//! config, so a given seed always drops the same datagrams.
//!
//! Inbound traffic is passed through untouched; place a simulator on each
//! side to lose traffic in both directions.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{Channel, ChannelError};

/// Configuration for the fault model.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability in `[0.0, 1.0]` that a sent datagram is dropped.
    pub loss_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // Transparent pass-through.
        Self {
            loss_rate: 0.0,
            seed: 0,
        }
    }
}

/// A fault-injecting wrapper around another channel.
#[derive(Debug)]
pub struct Simulator<C> {
    inner: C,
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
    dropped: AtomicU64,
}

impl<C: Channel> Simulator<C> {
    pub fn new(inner: C, config: SimulatorConfig) -> Self {
        let rng = Mutex::new(StdRng::seed_from_u64(config.seed));
        Self {
            inner,
            config,
            rng,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Number of datagrams discarded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn should_drop(&self) -> bool {
        let rate = self.config.loss_rate.clamp(0.0, 1.0);
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_bool(rate)
    }
}

impl<C: Channel> Channel for Simulator<C> {
    fn send_to(
        &self,
        bytes: &[u8],
        dest: SocketAddr,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send {
        // Decide before awaiting so the lock is never held across a suspension point.
        let drop_it = self.should_drop();
        async move {
            if drop_it {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("simulator: dropped {} byte datagram to {dest}", bytes.len());
                return Ok(());
            }
            self.inner.send_to(bytes, dest).await
        }
    }

    fn recv_from(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(Vec<u8>, SocketAddr), ChannelError>> + Send {
        self.inner.recv_from(timeout)
    }
}
