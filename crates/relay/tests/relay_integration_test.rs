use futures::StreamExt;
use protocol::{Detection, StreamMessage};
use relay::{AppState, ChannelProducer, Producer, serve};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestRelay {
    addr: SocketAddr,
    messages: mpsc::Sender<StreamMessage>,
    _stop: oneshot::Sender<()>,
}

async fn start_relay(idle_timeout: Duration) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, _) = broadcast::channel(16);
    let state = AppState::new(tx.clone(), idle_timeout);

    let (messages, rx) = mpsc::channel(16);
    tokio::spawn(ChannelProducer::new(rx).run(tx));

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, state, async {
        let _ = stopped.await;
    }));

    TestRelay {
        addr,
        messages,
        _stop: stop,
    }
}

async fn connect(addr: SocketAddr) -> Viewer {
    let (ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    ws
}

async fn next_text(viewer: &mut Viewer) -> String {
    loop {
        let message = timeout(WAIT, viewer.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .unwrap();
        match message {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn forwards_messages_verbatim_to_every_viewer() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let mut first = connect(relay.addr).await;
    let mut second = connect(relay.addr).await;

    let status = StreamMessage::status("Connected to camera stream");
    let frame = StreamMessage::frame("/9j/4AAQ", vec![Detection::new("person", 92.0)]);

    relay.messages.send(status.clone()).await.unwrap();
    relay.messages.send(frame.clone()).await.unwrap();

    for viewer in [&mut first, &mut second] {
        assert_eq!(next_text(viewer).await, status.encode().unwrap());
        assert_eq!(next_text(viewer).await, frame.encode().unwrap());
    }
}

#[tokio::test]
async fn one_viewer_leaving_does_not_affect_another() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let mut leaving = connect(relay.addr).await;
    let mut staying = connect(relay.addr).await;

    leaving.close(None).await.unwrap();
    let reply = timeout(WAIT, leaving.next()).await.unwrap();
    assert!(
        matches!(reply, None | Some(Ok(Message::Close(_)))),
        "relay should answer the closing handshake, got {reply:?}"
    );
    drop(leaving);

    let frame = StreamMessage::frame("AAEC", vec![]);
    relay.messages.send(frame.clone()).await.unwrap();

    assert_eq!(next_text(&mut staying).await, frame.encode().unwrap());
}

#[tokio::test]
async fn idle_viewer_is_closed_by_the_relay() {
    let relay = start_relay(Duration::from_millis(200)).await;
    let mut viewer = connect(relay.addr).await;

    let ended = timeout(WAIT, async {
        loop {
            match viewer.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;

    assert!(ended.is_ok(), "relay should close an idle connection");
}

#[tokio::test]
async fn malformed_upgrade_is_rejected_without_affecting_the_relay() {
    let relay = start_relay(Duration::from_secs(30)).await;

    let mut raw = TcpStream::connect(relay.addr).await.unwrap();
    raw.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    timeout(WAIT, raw.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(
        response.starts_with("HTTP/1.1 4"),
        "plain GET should be refused, got: {response}"
    );

    let mut viewer = connect(relay.addr).await;
    let status = StreamMessage::status("still serving");
    relay.messages.send(status.clone()).await.unwrap();
    assert_eq!(next_text(&mut viewer).await, status.encode().unwrap());
}
