//! End-to-end tests for peerchat sessions over loopback TCP.

use std::time::Duration;

use peerchat_core::SessionState;
use peerchat_transport::{Bridge, ChannelPresentation, Listener, Session, UiEvent};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(200);

// --- Helpers ---

/// Captures everything a session reports to its presentation.
struct Recorder {
    rx: UnboundedReceiver<UiEvent>,
}

impl Recorder {
    async fn next(&mut self) -> UiEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for ui event")
            .expect("ui channel closed")
    }

    /// Skip events until `wanted` shows up; return what was skipped.
    async fn until(&mut self, wanted: UiEvent) -> Vec<UiEvent> {
        let mut skipped = Vec::new();
        loop {
            let event = self.next().await;
            if event == wanted {
                return skipped;
            }
            skipped.push(event);
        }
    }

    async fn assert_quiet(&mut self) {
        if let Ok(Some(event)) = tokio::time::timeout(QUIET_PERIOD, self.rx.recv()).await {
            panic!("unexpected ui event: {event:?}");
        }
    }
}

fn session() -> (Session, Recorder) {
    let (presentation, rx) = ChannelPresentation::new();
    (Session::new(Bridge::new(presentation)), Recorder { rx })
}

async fn loopback_listener() -> (Listener, u16) {
    let listener = Listener::bind_addr("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let port = listener.port();
    (listener, port)
}

/// Host and joiner sessions, both Connected.
async fn connected_pair() -> ((Session, Recorder), (Session, Recorder)) {
    let (listener, port) = loopback_listener().await;

    let (host, mut host_ui) = session();
    host.host_with(listener).unwrap();

    let (joiner, mut joiner_ui) = session();
    joiner.join("127.0.0.1", port).unwrap();

    host_ui.until(UiEvent::InputEnabled(true)).await;
    joiner_ui.until(UiEvent::InputEnabled(true)).await;
    ((host, host_ui), (joiner, joiner_ui))
}

/// A joiner session connected to a raw socket the test controls.
async fn session_with_raw_peer() -> (Session, Recorder, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (session, mut ui) = session();
    session.join("127.0.0.1", port).unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    ui.until(UiEvent::InputEnabled(true)).await;
    (session, ui, peer)
}

// --- Scenarios ---

#[tokio::test]
async fn test_host_and_join_on_localhost() {
    let listener = Listener::bind(0).await.unwrap();
    let port = listener.port();

    let (host, mut host_ui) = session();
    host.host_with(listener).unwrap();
    assert_eq!(host.state(), SessionState::Establishing);

    let (joiner, mut joiner_ui) = session();
    joiner.join("localhost", port).unwrap();

    let host_log = host_ui.until(UiEvent::InputEnabled(true)).await;
    let joiner_log = joiner_ui.until(UiEvent::InputEnabled(true)).await;

    assert_eq!(host.state(), SessionState::Connected);
    assert_eq!(joiner.state(), SessionState::Connected);
    assert!(host.peer_addr().is_some());
    assert!(joiner.peer_addr().is_some());

    assert_eq!(
        host_log[0],
        UiEvent::Status(format!("Waiting for a peer to connect on port {port}..."))
    );
    assert!(matches!(&host_log[1], UiEvent::Status(s) if s.starts_with("IP: ")));
    assert!(matches!(&host_log[2], UiEvent::Status(s) if s.starts_with("Peer connected! (")));
    assert_eq!(
        joiner_log,
        vec![
            UiEvent::Status(format!("Connecting to localhost:{port}...")),
            UiEvent::Status("Connected to peer!".into()),
        ]
    );
}

#[tokio::test]
async fn test_host_message_reaches_joiner() {
    let ((host, mut host_ui), (_joiner, mut joiner_ui)) = connected_pair().await;

    host.submit("hello").await;

    assert_eq!(host_ui.next().await, UiEvent::MessageSent("hello".into()));
    assert_eq!(joiner_ui.next().await, UiEvent::MessageReceived("hello".into()));
}

#[tokio::test]
async fn test_bidirectional_exchange_preserves_order() {
    let ((host, mut host_ui), (joiner, mut joiner_ui)) = connected_pair().await;

    for i in 0..20 {
        joiner.submit(&format!("msg {i}")).await;
    }
    for i in 0..20 {
        assert_eq!(joiner_ui.next().await, UiEvent::MessageSent(format!("msg {i}")));
        assert_eq!(host_ui.next().await, UiEvent::MessageReceived(format!("msg {i}")));
    }

    host.submit("done").await;
    assert_eq!(host_ui.next().await, UiEvent::MessageSent("done".into()));
    assert_eq!(joiner_ui.next().await, UiEvent::MessageReceived("done".into()));
}

#[tokio::test]
async fn test_abrupt_peer_termination() {
    let (listener, port) = loopback_listener().await;
    let (host, mut host_ui) = session();
    host.host_with(listener).unwrap();

    let raw = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    host_ui.until(UiEvent::InputEnabled(true)).await;

    drop(raw);

    assert_eq!(host_ui.next().await, UiEvent::Status("Peer has disconnected.".into()));
    assert_eq!(host_ui.next().await, UiEvent::InputEnabled(false));
    tokio::time::timeout(EVENT_TIMEOUT, host.closed()).await.unwrap();
    assert_eq!(host.state(), SessionState::Disconnected);

    // Exactly once, and later hang-ups add nothing
    host.close().await;
    host_ui.assert_quiet().await;
}

#[tokio::test]
async fn test_peer_reset_disconnects() {
    let (session, mut ui, peer) = session_with_raw_peer().await;

    session.submit("unread").await;
    assert_eq!(ui.next().await, UiEvent::MessageSent("unread".into()));

    // Closing with unread data and zero linger resets the connection
    peer.readable().await.unwrap();
    peer.set_linger(Some(Duration::ZERO)).unwrap();
    drop(peer);

    assert_eq!(ui.next().await, UiEvent::Status("Peer has disconnected.".into()));
    assert_eq!(ui.next().await, UiEvent::InputEnabled(false));
    tokio::time::timeout(EVENT_TIMEOUT, session.closed()).await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    ui.assert_quiet().await;
}

#[tokio::test]
async fn test_joiner_session_drop_disconnects_host() {
    let ((host, mut host_ui), (joiner, _joiner_ui)) = connected_pair().await;

    drop(joiner);

    host_ui.until(UiEvent::Status("Peer has disconnected.".into())).await;
    assert_eq!(host_ui.next().await, UiEvent::InputEnabled(false));
    tokio::time::timeout(EVENT_TIMEOUT, host.closed()).await.unwrap();
}

#[tokio::test]
async fn test_dial_without_listener() {
    // Nothing listens on port 1 on a test machine
    let (joiner, mut ui) = session();
    joiner.join("127.0.0.1", 1).unwrap();

    assert_eq!(ui.next().await, UiEvent::Status("Connecting to 127.0.0.1:1...".into()));
    match ui.next().await {
        UiEvent::Error(text) => assert!(text.starts_with("Client connection error: "), "{text}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(ui.next().await, UiEvent::InputEnabled(false));

    tokio::time::timeout(EVENT_TIMEOUT, joiner.closed()).await.unwrap();
    assert_eq!(joiner.state(), SessionState::Disconnected);
    assert_eq!(joiner.peer_addr(), None);
}

#[tokio::test]
async fn test_host_on_taken_port() {
    let taken = Listener::bind(0).await.unwrap();
    let port = taken.port();

    let (host, mut ui) = session();
    host.host(port).unwrap();

    match ui.next().await {
        UiEvent::Error(text) => assert!(text.starts_with("Host connection error: "), "{text}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(ui.next().await, UiEvent::InputEnabled(false));
    tokio::time::timeout(EVENT_TIMEOUT, host.closed()).await.unwrap();
    drop(taken);
}

#[tokio::test]
async fn test_whitespace_submit_is_silent() {
    let (session, mut ui, mut peer) = session_with_raw_peer().await;

    session.submit("  ").await;
    session.submit("").await;
    session.submit("\t \t").await;

    ui.assert_quiet().await;
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(QUIET_PERIOD, peer.read(&mut buf)).await;
    assert!(read.is_err(), "no bytes should reach the wire");
    assert_eq!(session.state(), SessionState::Connected);
}

// --- Properties ---

#[tokio::test]
async fn test_submit_writes_exactly_one_line() {
    let (session, mut ui, mut peer) = session_with_raw_peer().await;

    session.submit("  padded text ").await;
    assert_eq!(ui.next().await, UiEvent::MessageSent("  padded text ".into()));
    ui.assert_quiet().await;

    session.close().await;
    let mut wire = Vec::new();
    peer.read_to_end(&mut wire).await.unwrap();
    assert_eq!(wire, b"  padded text \n");
}

#[tokio::test]
async fn test_received_line_is_byte_for_byte() {
    let (_session, mut ui, mut peer) = session_with_raw_peer().await;

    peer.write_all("héllo  wörld \t!\n".as_bytes()).await.unwrap();
    peer.write_all(b"dos line\r\n").await.unwrap();

    assert_eq!(ui.next().await, UiEvent::MessageReceived("héllo  wörld \t!".into()));
    assert_eq!(ui.next().await, UiEvent::MessageReceived("dos line".into()));
}

#[tokio::test]
async fn test_unterminated_line_delivered_before_disconnect() {
    let (session, mut ui, mut peer) = session_with_raw_peer().await;

    peer.write_all(b"bye").await.unwrap();
    peer.shutdown().await.unwrap();

    assert_eq!(ui.next().await, UiEvent::MessageReceived("bye".into()));
    assert_eq!(ui.next().await, UiEvent::Status("Peer has disconnected.".into()));
    assert_eq!(ui.next().await, UiEvent::InputEnabled(false));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_submit_after_disconnect_is_noop() {
    let (session, mut ui, peer) = session_with_raw_peer().await;
    drop(peer);
    ui.until(UiEvent::InputEnabled(false)).await;

    session.submit("anyone there?").await;
    ui.assert_quiet().await;
}

#[tokio::test]
async fn test_submit_before_connect_is_noop() {
    let (session, mut ui) = session();
    session.submit("too early").await;
    ui.assert_quiet().await;
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_second_role_rejected() {
    let (listener, port) = loopback_listener().await;
    let (session, _ui) = session();
    session.host_with(listener).unwrap();

    let err = session.join("127.0.0.1", port).unwrap_err();
    assert!(err.to_string().contains("already started"));
    assert_eq!(session.state(), SessionState::Establishing);
}

#[tokio::test]
async fn test_disconnected_session_cannot_restart() {
    let (session, mut ui) = session();
    session.join("127.0.0.1", 1).unwrap();
    ui.until(UiEvent::InputEnabled(false)).await;

    assert!(session.host(0).is_err());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_local_hang_up_seen_by_peer_session() {
    let ((host, mut host_ui), (joiner, mut joiner_ui)) = connected_pair().await;

    joiner.close().await;
    assert_eq!(joiner_ui.next().await, UiEvent::Status("Disconnected.".into()));
    assert_eq!(joiner_ui.next().await, UiEvent::InputEnabled(false));

    assert_eq!(host_ui.next().await, UiEvent::Status("Peer has disconnected.".into()));
    assert_eq!(host_ui.next().await, UiEvent::InputEnabled(false));
    tokio::time::timeout(EVENT_TIMEOUT, host.closed()).await.unwrap();
}

#[tokio::test]
async fn test_raw_peer_sees_lines() {
    let (session, _ui, peer) = session_with_raw_peer().await;

    session.submit("one").await;
    session.submit("two").await;

    let mut lines = BufReader::new(peer).lines();
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("one"));
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("two"));
}
