use crate::{Payload, RelayError};
use common::Backoff;
use futures::StreamExt;
use protocol::{CameraAddress, MAX_MESSAGE_BYTES, StreamMessage};
use std::future::Future;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{Message, protocol::WebSocketConfig},
};

/// Source of stream messages fanned out to every connected viewer.
///
/// Implementations publish complete, encoded messages; the relay forwards
/// them verbatim.
pub trait Producer: Send + 'static {
    fn run(self, tx: broadcast::Sender<Payload>) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Client of a detection producer that already speaks the stream protocol
/// over WebSocket.
///
/// Reconnects with backoff forever. While the producer is unreachable,
/// viewers receive a single `error` message so a broken source is visible as
/// such rather than as a broken relay.
pub struct UpstreamProducer {
    url: String,
    camera: CameraAddress,
    backoff: Backoff,
}

impl UpstreamProducer {
    pub fn new(url: impl Into<String>, camera: CameraAddress, backoff: Backoff) -> Self {
        Self {
            url: url.into(),
            camera,
            backoff,
        }
    }

    fn unavailable_message(&self) -> StreamMessage {
        StreamMessage::error(format!(
            "Cannot access the detection producer for camera {} at {}. \
             Please check that the producer is running.",
            self.camera, self.url
        ))
    }

    async fn pump(
        &self,
        mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        tx: &broadcast::Sender<Payload>,
    ) -> Result<(), RelayError> {
        while let Some(message) = stream.next().await {
            match message? {
                Message::Text(text) => {
                    // No receivers is normal between viewers
                    let _ = tx.send(Payload::from(text));
                }
                Message::Binary(bytes) => {
                    tracing::warn!(len = bytes.len(), "Dropping binary frame from producer");
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }
}

pub fn upstream_ws_config() -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(MAX_MESSAGE_BYTES),
        max_frame_size: Some(MAX_MESSAGE_BYTES),
        ..Default::default()
    }
}

impl Producer for UpstreamProducer {
    async fn run(mut self, tx: broadcast::Sender<Payload>) -> anyhow::Result<()> {
        let mut reported_down = false;

        loop {
            match connect_async_with_config(self.url.as_str(), Some(upstream_ws_config()), false)
                .await
            {
                Ok((stream, _)) => {
                    tracing::info!(url = %self.url, camera = %self.camera, "Detection producer connected");
                    self.backoff.reset();
                    reported_down = false;

                    match self.pump(stream, &tx).await {
                        Ok(()) => tracing::info!(url = %self.url, "Detection producer closed the stream"),
                        Err(e) => tracing::warn!(url = %self.url, error = %e, "Detection producer stream failed"),
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %self.url, error = %e, "Detection producer unreachable");
                }
            }

            if !reported_down {
                let payload = self.unavailable_message().encode()?;
                let _ = tx.send(Payload::from(payload));
                reported_down = true;
            }

            self.backoff.wait("detection producer connect").await;
        }
    }
}

/// In-process producer fed through a channel. Ends when every sender is dropped.
pub struct ChannelProducer {
    rx: mpsc::Receiver<StreamMessage>,
}

impl ChannelProducer {
    pub fn new(rx: mpsc::Receiver<StreamMessage>) -> Self {
        Self { rx }
    }
}

impl Producer for ChannelProducer {
    async fn run(mut self, tx: broadcast::Sender<Payload>) -> anyhow::Result<()> {
        while let Some(message) = self.rx.recv().await {
            let payload = message.encode()?;
            tracing::debug!(kind = message.kind(), "Publishing stream message");
            let _ = tx.send(Payload::from(payload));
        }
        tracing::info!("Channel producer finished");
        Ok(())
    }
}
