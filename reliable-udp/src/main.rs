//! Command-line front end.
//!
//! `server` binds a UDP port and answers segments until ctrl-c.  `client`
//! sends one run of segments and exits non-zero if a segment is abandoned.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use reliable_udp::{ReceiverConfig, Sender, SenderConfig, Server, Socket};

/// Stop-and-wait segment delivery over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run as the receiver, validating and answering every segment.
    Server {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Run as the sender, delivering a fixed run of segments.
    Client {
        /// Receiver address.
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        server: SocketAddr,
        /// Number of segments to send.
        #[arg(short = 'n', long, default_value_t = 5)]
        segments: u16,
        /// Per-attempt wait for a response, in milliseconds.
        #[arg(short, long, default_value_t = 3000)]
        timeout_ms: u64,
        /// Attempts per segment before the run is aborted.
        #[arg(short = 'r', long, default_value_t = 3)]
        max_retries: u32,
        /// Sender id written into each segment.
        #[arg(long, default_value_t = 1)]
        sender_id: u8,
        /// Send every segment clean instead of corrupting first attempts.
        #[arg(long)]
        no_faults: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server { bind } => {
            let config = ReceiverConfig { bind };
            let mut server = Server::bind(&config)
                .await
                .with_context(|| format!("binding {bind}"))?;
            tokio::select! {
                _ = server.run() => {}
                _ = tokio::signal::ctrl_c() => log::info!("shutting down"),
            }
        }
        Mode::Client {
            server,
            segments,
            timeout_ms,
            max_retries,
            sender_id,
            no_faults,
        } => {
            let config = SenderConfig {
                destination: server,
                segments,
                ack_timeout: Duration::from_millis(timeout_ms),
                max_retries,
                sender_id,
                inject_faults: !no_faults,
            };
            let local: SocketAddr = if server.is_ipv6() {
                "[::]:0".parse()?
            } else {
                "0.0.0.0:0".parse()?
            };
            let socket = Socket::bind(local).await.context("binding client socket")?;
            log::info!("sending {segments} segment(s) to {server}");
            let report = Sender::new(socket, config).run().await?;
            log::info!(
                "all {} segment(s) acknowledged ({} transmissions)",
                report.delivered,
                report.transmissions
            );
        }
    }
    Ok(())
}
