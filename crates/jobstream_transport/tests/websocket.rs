use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use jobstream_transport::{
    EventSink, SentinelPredicate, StreamTransport, TransportError, TransportEvent,
    WebSocketTransport,
};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<TransportEvent>>>,
}

impl TestSink {
    fn new() -> Self {
        Self::default()
    }

    fn take(&self) -> Vec<TransportEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: TransportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn chunks(events: Vec<TransportEvent>) -> Vec<String> {
    events
        .into_iter()
        .filter_map(|event| match event {
            TransportEvent::Chunk { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

fn harvest_transport(addr: std::net::SocketAddr) -> WebSocketTransport {
    WebSocketTransport::new(
        format!("ws://{addr}"),
        Arc::new(SentinelPredicate::new("Done: harvest", "Error: harvest")),
    )
}

#[tokio::test]
async fn emits_every_frame_and_closes_the_socket_on_the_sentinel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Push a progress frame and the terminating frame, then wait: the
    // adapter, not the server, must send the close frame.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        socket
            .send(Message::text("\"ingesting batch 1 of 2\""))
            .await
            .unwrap();
        socket
            .send(Message::text("\"Done: harvest complete (14 items)\""))
            .await
            .unwrap();
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return false,
            }
        }
    });

    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    harvest_transport(addr)
        .run(31, &sink, &cancel)
        .await
        .expect("run ok");

    assert_eq!(
        chunks(sink.take()),
        vec![
            "ingesting batch 1 of 2".to_string(),
            "Done: harvest complete (14 items)".to_string(),
        ]
    );
    assert!(server.await.unwrap(), "adapter never sent a close frame");
}

#[tokio::test]
async fn an_unexpected_server_close_ends_the_run_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        socket
            .send(Message::text("\"ingesting batch 1 of 9\""))
            .await
            .unwrap();
        // Server goes away without ever sending a sentinel.
        socket.close(None).await.unwrap();
    });

    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    harvest_transport(addr)
        .run(32, &sink, &cancel)
        .await
        .expect("clean end");

    assert_eq!(
        chunks(sink.take()),
        vec!["ingesting batch 1 of 9".to_string()]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn a_refused_handshake_is_a_handshake_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept the TCP connection and hang up before the upgrade.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    let err = harvest_transport(addr)
        .run(33, &sink, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Handshake(_)));
    assert!(sink.take().is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn rejects_a_non_websocket_scheme() {
    let transport = WebSocketTransport::new(
        "https://example.com/updates",
        Arc::new(SentinelPredicate::new("DONE", "ERR")),
    );
    let sink = TestSink::new();
    let cancel = CancellationToken::new();

    let err = transport.run(34, &sink, &cancel).await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidUrl(_)));
}
