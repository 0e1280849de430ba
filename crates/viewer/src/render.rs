use crate::{ConnectionPhase, ConnectionState, FrameImage};
use protocol::Detection;
use std::fmt;

/// The single thing a view shows for a given state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderState<'a> {
    NoStream,
    Connecting {
        status: &'a str,
    },
    Live {
        frame: Option<&'a FrameImage>,
        detections: &'a [Detection],
    },
    ErrorBanner {
        message: &'a str,
    },
}

impl ConnectionState {
    /// An error banner wins over everything except an idle session; the last
    /// good frame stays in the state underneath it.
    pub fn render(&self) -> RenderState<'_> {
        if self.phase == ConnectionPhase::Idle {
            return RenderState::NoStream;
        }
        if let Some(message) = self.error_text.as_deref() {
            return RenderState::ErrorBanner { message };
        }
        match self.phase {
            ConnectionPhase::Active => RenderState::Live {
                frame: self.frame.as_ref(),
                detections: &self.detections,
            },
            _ => RenderState::Connecting {
                status: &self.status_text,
            },
        }
    }
}

impl fmt::Display for RenderState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderState::NoStream => f.write_str("Video stream disconnected"),
            RenderState::Connecting { status } => f.write_str(status),
            RenderState::Live { frame: None, .. } => f.write_str("Live: waiting for video frames..."),
            RenderState::Live {
                frame: Some(_),
                detections,
            } => write!(f, "Live: {} detected objects", detections.len()),
            RenderState::ErrorBanner { message } => write!(f, "Connection error: {message}"),
        }
    }
}
