use crate::{ConnectionState, StreamConsumer, TransportEvent};
use futures::StreamExt;
use protocol::{MAX_MESSAGE_BYTES, TransportDescriptor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{Message, protocol::WebSocketConfig},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the relay to answer a close frame.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

struct Shared {
    /// Bumped on every connect and disconnect. A transport task only applies
    /// events while its epoch is current.
    epoch: u64,
    consumer: StreamConsumer,
    tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn publish(&self) {
        let next = self.consumer.state();
        self.tx.send_if_modified(|current| {
            if current != next {
                *current = next.clone();
                true
            } else {
                false
            }
        });
    }
}

type SharedState = Arc<Mutex<Shared>>;

fn lock(shared: &SharedState) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The live transport task and the signal asking it to close.
struct Transport {
    close: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns at most one stream transport and exposes the consumer state it drives.
///
/// Must be used from within a Tokio runtime. Dropping the session asks the
/// transport to close in the background; [`StreamSession::disconnect`] waits
/// for it.
pub struct StreamSession {
    shared: SharedState,
    transport: Option<Transport>,
}

impl StreamSession {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::default());
        Self {
            shared: Arc::new(Mutex::new(Shared {
                epoch: 0,
                consumer: StreamConsumer::new(),
                tx,
            })),
            transport: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared).consumer.state().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        lock(&self.shared).tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared).consumer.state().is_active()
    }

    /// Open a fresh transport to the relay described by `descriptor`,
    /// tearing down any previous one first.
    pub async fn connect(&mut self, descriptor: &TransportDescriptor) {
        self.disconnect().await;

        let epoch = {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.consumer.begin();
            shared.publish();
            shared.epoch
        };

        let url = descriptor.url();
        tracing::info!(%url, "Connecting to video stream");

        let (close, closed) = oneshot::channel();
        let task = tokio::spawn(drive(url, Arc::clone(&self.shared), epoch, closed));
        self.transport = Some(Transport { close, task });
    }

    /// Close the transport with a WebSocket closing handshake and return to idle.
    ///
    /// Once this returns the transport is released and no event from it can
    /// reach the state. Calling it while idle is a no-op.
    pub async fn disconnect(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.consumer.reset();
            shared.publish();
        }

        let Some(Transport { close, mut task }) = self.transport.take() else {
            return;
        };

        tracing::info!("Closing video stream");
        let _ = close.send(());
        if time::timeout(DISCONNECT_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!("Video stream did not close in time, aborting");
            task.abort();
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `event` if `epoch` is still current. Returns false once the
/// session has moved on, telling the transport task to stop.
fn apply(shared: &SharedState, epoch: u64, event: TransportEvent) -> bool {
    let mut shared = lock(shared);
    if shared.epoch != epoch {
        return false;
    }
    shared.consumer.handle(event);
    shared.publish();
    true
}

fn stream_ws_config() -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(MAX_MESSAGE_BYTES),
        max_frame_size: Some(MAX_MESSAGE_BYTES),
        ..Default::default()
    }
}

async fn drive(url: String, shared: SharedState, epoch: u64, mut closed: oneshot::Receiver<()>) {
    let connecting = connect_async_with_config(url.as_str(), Some(stream_ws_config()), false);
    let mut stream = tokio::select! {
        _ = &mut closed => return,
        result = connecting => match result {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::error!(%url, error = %e, "WebSocket connection failed");
                if apply(&shared, epoch, TransportEvent::Error(e.to_string())) {
                    apply(&shared, epoch, TransportEvent::Closed);
                }
                return;
            }
        },
    };

    tracing::info!(%url, "WebSocket connection established");
    if !apply(&shared, epoch, TransportEvent::Open) {
        close_transport(&mut stream, &url).await;
        return;
    }

    loop {
        let message = tokio::select! {
            _ = &mut closed => {
                close_transport(&mut stream, &url).await;
                return;
            }
            message = stream.next() => message,
        };

        let event = match message {
            None | Some(Ok(Message::Close(_))) => break,
            Some(Ok(Message::Text(text))) => TransportEvent::Message(text),
            Some(Ok(Message::Binary(bytes))) => {
                tracing::debug!(len = bytes.len(), "Ignoring binary message");
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::error!(%url, error = %e, "WebSocket error");
                if !apply(&shared, epoch, TransportEvent::Error(e.to_string())) {
                    return;
                }
                break;
            }
        };

        if !apply(&shared, epoch, event) {
            close_transport(&mut stream, &url).await;
            return;
        }
    }

    tracing::info!(%url, "WebSocket connection closed");
    apply(&shared, epoch, TransportEvent::Closed);
}

/// Send a close frame and wait for the relay to answer it.
async fn close_transport(stream: &mut WsStream, url: &str) {
    if let Err(e) = stream.close(None).await {
        tracing::debug!(%url, error = %e, "Close frame not delivered");
        return;
    }

    let answered = time::timeout(HANDSHAKE_TIMEOUT, async {
        while let Some(Ok(_)) = stream.next().await {}
    })
    .await;
    if answered.is_err() {
        tracing::debug!(%url, "Relay did not answer the closing handshake");
    }
}
