//! Sessions over real TCP sockets.


use mock_implementations::{client_identity, SimulatedVerifier};
use srp_interactive::{connect, ClientSession, InteractiveError, ProofPlan, SessionOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

#[tokio::test]
async fn test_session_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        SimulatedVerifier::default().serve(stream).await
    });

    let channel = connect(addr).await.expect("Failed to connect");
    let mut session = ClientSession::new(channel, client_identity(), SessionOptions::default());
    let plan = ProofPlan {
        min: 0,
        max: 255,
        bitlen: 8,
        rounds: 2,
    };

    let report = timeout(Duration::from_secs(10), session.run(&plan))
        .await
        .expect("session timed out")
        .expect("session failed");
    assert_eq!(report.accepted(), 2);

    let log = timeout(Duration::from_secs(10), server)
        .await
        .expect("server timed out")
        .unwrap()
        .unwrap();
    assert_eq!(log.proofs_verified, 2);
}

#[tokio::test]
async fn test_server_closing_socket() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        drop(stream);
    });

    let channel = connect(addr).await.expect("Failed to connect");
    let mut session = ClientSession::new(channel, client_identity(), SessionOptions::default());

    let err = timeout(Duration::from_secs(10), session.authenticate())
        .await
        .expect("authenticate hung")
        .unwrap_err();
    assert!(
        matches!(
            err,
            InteractiveError::Disconnected | InteractiveError::Transport(_)
        ),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");
    drop(listener);

    assert!(matches!(
        connect(addr).await,
        Err(InteractiveError::Transport(_))
    ));
}
