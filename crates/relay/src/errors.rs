use crate::connection::ConnectionPhase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid connection transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConnectionPhase,
        to: ConnectionPhase,
    },

    #[error("Failed to send to viewer: {0}")]
    Send(axum::Error),

    #[error("Viewer stopped reading for {0:?}")]
    Stalled(std::time::Duration),

    #[error("Failed to receive from viewer: {0}")]
    Receive(axum::Error),

    #[error("Upstream producer error: {0}")]
    Upstream(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode stream message: {0}")]
    Encode(#[from] protocol::ProtocolError),
}
