use crate::FrameImage;
use protocol::{Detection, StreamMessage};

pub const WAITING_STATUS: &str = "Waiting for connection...";
pub const CONNECTED_STATUS: &str = "Connected to video stream";
/// Shown for transport failures, as opposed to errors reported by the producer.
pub const TRANSPORT_ERROR_MESSAGE: &str = "Failed to connect to video stream server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Active,
    Erroring,
    Closed,
}

/// Everything a view needs to render the stream. Each field holds the latest
/// value written to it; nothing is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub status_text: String,
    pub error_text: Option<String>,
    pub frame: Option<FrameImage>,
    pub detections: Vec<Detection>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            status_text: WAITING_STATUS.to_string(),
            error_text: None,
            frame: None,
            detections: Vec::new(),
        }
    }
}

impl ConnectionState {
    pub fn is_active(&self) -> bool {
        self.phase == ConnectionPhase::Active
    }
}

/// Lifecycle events of one transport, delivered in the order it produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(String),
    Closed,
}

#[derive(Debug, Default)]
pub struct StreamConsumer {
    state: ConnectionState,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Start a fresh session. Only valid from `Idle` or `Closed`; returns
    /// false otherwise.
    pub fn begin(&mut self) -> bool {
        match self.state.phase {
            ConnectionPhase::Idle | ConnectionPhase::Closed => {
                self.state = ConnectionState {
                    phase: ConnectionPhase::Connecting,
                    ..ConnectionState::default()
                };
                true
            }
            _ => false,
        }
    }

    /// Forget the session. Calling it again is a no-op.
    pub fn reset(&mut self) {
        self.state = ConnectionState::default();
    }

    pub fn handle(&mut self, event: TransportEvent) {
        use ConnectionPhase::*;

        match (event, self.state.phase) {
            (TransportEvent::Open, Connecting) => {
                self.state.phase = Active;
                self.state.error_text = None;
                self.state.status_text = CONNECTED_STATUS.to_string();
            }
            (TransportEvent::Message(text), Active | Erroring) => self.on_message(&text),
            (TransportEvent::Error(detail), Connecting | Active | Erroring) => {
                tracing::error!(detail = %detail, "Video stream transport error");
                self.state.error_text = Some(TRANSPORT_ERROR_MESSAGE.to_string());
                self.state.phase = Erroring;
            }
            (TransportEvent::Closed, Connecting | Active | Erroring) => {
                tracing::info!("Video stream connection closed");
                self.state.phase = Closed;
            }
            (event, phase) => {
                tracing::debug!(?phase, event = event_name(&event), "Ignoring transport event");
            }
        }
    }

    fn on_message(&mut self, text: &str) {
        let message = match StreamMessage::decode(text) {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!("Ignoring stream message with unknown type");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse stream message");
                return;
            }
        };

        match message {
            StreamMessage::Error { message } => {
                self.state.error_text = Some(message);
                self.state.phase = ConnectionPhase::Erroring;
            }
            StreamMessage::Status { message } => {
                self.state.status_text = message;
            }
            StreamMessage::Frame {
                image, detections, ..
            } => match FrameImage::decode(&image) {
                Ok(frame) => {
                    self.state.frame = Some(frame);
                    self.state.detections = detections;
                }
                Err(e) => tracing::warn!(error = %e, "Dropping frame with undecodable image"),
            },
        }
    }
}

fn event_name(event: &TransportEvent) -> &'static str {
    match event {
        TransportEvent::Open => "open",
        TransportEvent::Message(_) => "message",
        TransportEvent::Error(_) => "error",
        TransportEvent::Closed => "closed",
    }
}
