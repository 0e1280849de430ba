use crate::{Payload, RelayError, metrics::RelayMetrics};
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Upgrading,
    Open,
    Closing,
    Errored,
    Closed,
}

impl ConnectionPhase {
    pub fn can_advance_to(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        matches!(
            (self, next),
            (Upgrading, Open)
                | (Upgrading, Errored)
                | (Open, Closing)
                | (Open, Errored)
                | (Closing, Closed)
                | (Errored, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionPhase::Closed
    }
}

/// Tracks one viewer connection through
/// `Upgrading -> Open -> {Closing, Errored} -> Closed`.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    peer: SocketAddr,
    phase: ConnectionPhase,
}

impl ConnectionLifecycle {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            phase: ConnectionPhase::Upgrading,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn advance(&mut self, next: ConnectionPhase) -> Result<(), RelayError> {
        if !self.phase.can_advance_to(next) {
            return Err(RelayError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        tracing::debug!(peer = %self.peer, from = ?self.phase, to = ?next, "Connection transition");
        self.phase = next;
        Ok(())
    }

    fn finish_with(&mut self, next: ConnectionPhase) {
        if let Err(e) = self.advance(next) {
            tracing::warn!(peer = %self.peer, error = %e, "Ignoring connection transition");
        }
    }

    /// Drive any non-terminal phase to `Closed` through the legal path.
    pub fn finish(&mut self) {
        let path: &[ConnectionPhase] = match self.phase {
            ConnectionPhase::Upgrading => &[ConnectionPhase::Errored, ConnectionPhase::Closed],
            ConnectionPhase::Open => &[ConnectionPhase::Closing, ConnectionPhase::Closed],
            ConnectionPhase::Closing | ConnectionPhase::Errored => &[ConnectionPhase::Closed],
            ConnectionPhase::Closed => &[],
        };
        for next in path {
            self.phase = *next;
        }
    }
}

/// Upper bound on the closing handshake with a viewer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    PeerClosed,
    ProducerGone,
    IdleTimeout,
}

impl Ending {
    fn reason(self) -> &'static str {
        match self {
            Ending::PeerClosed => "viewer closed the connection",
            Ending::ProducerGone => "detection producer stopped",
            Ending::IdleTimeout => "idle timeout",
        }
    }
}

/// Serve one upgraded viewer socket until it closes, errors or goes idle.
///
/// `rx` must be subscribed before the upgrade completes so the viewer sees
/// every frame published after its handshake.
pub async fn handle_socket(
    socket: WebSocket,
    lifecycle: ConnectionLifecycle,
    rx: broadcast::Receiver<Payload>,
    idle_timeout: Duration,
    metrics: RelayMetrics,
) {
    let (sender, receiver) = socket.split();
    serve_viewer(sender, receiver, lifecycle, rx, idle_timeout, metrics).await;
}

/// Forward broadcast frames to one viewer over any message sink/stream pair.
///
/// Returns the phase the connection ended through: `Closing` for an orderly
/// end from either side, `Errored` for transport failures and viewers that
/// stop reading for longer than `idle_timeout`.
pub async fn serve_viewer<Tx, Rx>(
    mut sender: Tx,
    mut receiver: Rx,
    mut lifecycle: ConnectionLifecycle,
    mut rx: broadcast::Receiver<Payload>,
    idle_timeout: Duration,
    metrics: RelayMetrics,
) -> ConnectionPhase
where
    Tx: Sink<Message, Error = axum::Error> + Unpin,
    Rx: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let peer = lifecycle.peer();

    if let Err(e) = lifecycle.advance(ConnectionPhase::Open) {
        tracing::error!(%peer, error = %e, "Connection opened from unexpected phase");
        return lifecycle.phase();
    }
    metrics.connection_opened();
    tracing::info!(%peer, "Viewer connected");

    match forward(&mut sender, &mut receiver, &mut rx, idle_timeout, &metrics).await {
        Ok(ending) => {
            lifecycle.finish_with(ConnectionPhase::Closing);
            tracing::info!(%peer, reason = ending.reason(), "Closing viewer connection");

            let closed = match ending {
                // Completes the handshake the viewer started
                Ending::PeerClosed => time::timeout(CLOSE_TIMEOUT, sender.close()).await,
                Ending::ProducerGone | Ending::IdleTimeout => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: ending.reason().into(),
                    };
                    time::timeout(CLOSE_TIMEOUT, sender.send(Message::Close(Some(frame)))).await
                }
            };
            match closed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(%peer, error = %e, "Close frame not delivered"),
                Err(_) => tracing::debug!(%peer, "Closing handshake timed out"),
            }
        }
        Err(e) => {
            lifecycle.finish_with(ConnectionPhase::Errored);
            metrics.connection_errored();
            tracing::error!(%peer, error = %e, "Viewer connection failed");
        }
    }

    let outcome = lifecycle.phase();

    // Dropping the halves releases the socket; nothing about the viewer outlives this call
    drop(sender);
    drop(receiver);
    lifecycle.finish();
    metrics.connection_closed();
    tracing::info!(%peer, outcome = ?outcome, "Viewer disconnected");

    outcome
}

async fn forward<Tx, Rx>(
    sender: &mut Tx,
    receiver: &mut Rx,
    rx: &mut broadcast::Receiver<Payload>,
    idle_timeout: Duration,
    metrics: &RelayMetrics,
) -> Result<Ending, RelayError>
where
    Tx: Sink<Message, Error = axum::Error> + Unpin,
    Rx: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let idle = time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(payload) => {
                    // A viewer that stops reading stalls the send; bound it like idleness
                    time::timeout(idle_timeout, sender.send(Message::Text(payload.to_string())))
                        .await
                        .map_err(|_| RelayError::Stalled(idle_timeout))?
                        .map_err(RelayError::Send)?;
                    metrics.frame_forwarded();
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Viewer too slow, skipping frames");
                    metrics.frames_skipped(skipped);
                }
                Err(RecvError::Closed) => return Ok(Ending::ProducerGone),
            },
            incoming = receiver.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => return Ok(Ending::PeerClosed),
                // Viewers are receive-only; pings are answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(RelayError::Receive(e)),
            },
            () = &mut idle => return Ok(Ending::IdleTimeout),
        }
    }
}
