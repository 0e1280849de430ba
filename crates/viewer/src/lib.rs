//! Client side of the detection stream: negotiation, the stream consumer
//! state machine and the session that drives it over a WebSocket.

pub mod capability;
pub mod errors;
pub mod frame;
pub mod negotiation;
pub mod render;
pub mod session;
pub mod state;

pub use capability::Capability;
pub use errors::ViewerError;
pub use frame::FrameImage;
pub use negotiation::{NegotiationClient, SessionCheck};
pub use render::RenderState;
pub use session::StreamSession;
pub use state::{ConnectionPhase, ConnectionState, StreamConsumer, TransportEvent};
