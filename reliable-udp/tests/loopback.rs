//! End-to-end tests over real loopback UDP sockets.
//!
//! The server half runs in a background task processing a known number of
//! datagrams, then hands itself back so its final state can be inspected.

use std::net::SocketAddr;
use std::time::Duration;

use reliable_udp::{
    config::ReceiverConfig,
    server::Handled,
    simulator::{Simulator, SimulatorConfig},
    AttemptOutcome, Channel, RejectCode, Response, SendError, Sender, SenderConfig, Server,
    Socket,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn bind_server() -> (Server<Socket>, SocketAddr) {
    let config = ReceiverConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
    };
    let server = Server::bind(&config).await.expect("bind server socket");
    let addr = server.local_addr();
    (server, addr)
}

async fn ephemeral() -> Socket {
    Socket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind client socket")
}

fn client_config(destination: SocketAddr, inject_faults: bool) -> SenderConfig {
    SenderConfig {
        destination,
        ack_timeout: Duration::from_millis(500),
        inject_faults,
        ..SenderConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// The reference run: segment 1 clean, segments 2..=5 each provoke one of
/// the four rejects and are then accepted on the clean retry.
#[tokio::test]
async fn reference_run_exercises_every_reject_and_completes() {
    let (mut server, server_addr) = bind_server().await;

    let server_task = tokio::spawn(async move {
        let mut handled = Vec::new();
        for _ in 0..9 {
            handled.push(server.serve_one().await.expect("serve"));
        }
        (server, handled)
    });

    let sender = Sender::new(ephemeral().await, client_config(server_addr, true));
    let report = tokio::time::timeout(Duration::from_secs(10), sender.run())
        .await
        .expect("run timed out")
        .expect("run failed");
    assert_eq!(report.delivered, 5);
    assert_eq!(report.transmissions, 9);

    let (server, handled) = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server timed out")
        .expect("server task panicked");
    assert_eq!(server.receiver().expected_seq(), 6);

    let responses: Vec<Response> = handled
        .into_iter()
        .map(|h| match h {
            Handled::Answered { response, .. } => response,
            other => panic!("unexpected {other:?}"),
        })
        .collect();

    let reject = |seq, code| Response::Reject {
        sender_id: 1,
        seq,
        code,
    };
    let ack = |seq| Response::Ack { sender_id: 1, seq };
    assert_eq!(
        responses,
        vec![
            ack(1),
            reject(3, RejectCode::OutOfSequence),
            ack(2),
            reject(3, RejectCode::LengthMismatch),
            ack(3),
            reject(4, RejectCode::EndMissing),
            ack(4),
            reject(4, RejectCode::Duplicate),
            ack(5),
        ]
    );
}

#[tokio::test]
async fn clean_run_needs_one_transmission_per_segment() {
    let (mut server, server_addr) = bind_server().await;
    let server_task = tokio::spawn(async move {
        for _ in 0..5 {
            server.serve_one().await.expect("serve");
        }
        server
    });

    let sender = Sender::new(ephemeral().await, client_config(server_addr, false));
    let report = sender.run().await.expect("run");
    assert_eq!(report.transmissions, 5);

    let server = server_task.await.unwrap();
    assert_eq!(server.receiver().expected_seq(), 6);
}

#[tokio::test]
async fn foreign_datagrams_get_no_response() {
    let (mut server, server_addr) = bind_server().await;
    let server_task = tokio::spawn(async move {
        let first = server.serve_one().await.expect("serve");
        let second = server.serve_one().await.expect("serve");
        (server, first, second)
    });

    let client = ephemeral().await;
    // Too short to be a data frame.
    client.send_to(b"hello", server_addr).await.unwrap();
    // Well-sized data frame with a foreign start marker.
    let mut frame = reliable_udp::DataSegment::new(1, 1, b"x".to_vec())
        .unwrap()
        .encode()
        .unwrap();
    frame[0] = 0x00;
    client.send_to(&frame, server_addr).await.unwrap();

    let (server, first, second) = server_task.await.unwrap();
    assert!(matches!(first, Handled::Undecodable(_)));
    assert_eq!(second, Handled::Dropped);
    assert_eq!(server.receiver().expected_seq(), 1);

    let silence = client.recv_from(Some(Duration::from_millis(200))).await;
    assert!(matches!(silence, Err(reliable_udp::ChannelError::Timeout)));
}

/// Nobody listening: every attempt times out and the run stops at segment 1.
#[tokio::test]
async fn silent_peer_aborts_after_max_retries() {
    let silent_addr = {
        let tmp = ephemeral().await;
        tmp.local_addr // tmp is dropped here, so nothing answers on this port
    };

    let config = SenderConfig {
        ack_timeout: Duration::from_millis(100),
        ..client_config(silent_addr, true)
    };
    let err = Sender::new(ephemeral().await, config).run().await.unwrap_err();
    assert!(
        matches!(
            err,
            SendError::Aborted {
                seq: 1,
                delivered: 0,
                attempts: 3,
                last: AttemptOutcome::TimedOut,
            }
        ),
        "expected abort on segment 1, got: {err}"
    );
}

/// A fully lossy link loses every segment-1 attempt.
#[tokio::test]
async fn lossy_link_exhausts_retries() {
    let (mut server, server_addr) = bind_server().await;
    let server_task = tokio::spawn(async move { server.run().await });

    let channel = Simulator::new(
        ephemeral().await,
        SimulatorConfig {
            loss_rate: 1.0,
            seed: 3,
        },
    );
    let config = SenderConfig {
        ack_timeout: Duration::from_millis(100),
        ..client_config(server_addr, false)
    };
    let sender = Sender::new(channel, config);
    let err = sender.run().await.unwrap_err();
    assert!(matches!(err, SendError::Aborted { seq: 1, attempts: 3, .. }));
    assert_eq!(sender.channel().dropped(), 3);

    server_task.abort();
}
