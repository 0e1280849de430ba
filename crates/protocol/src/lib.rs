//! Wire contract shared by the negotiator, the relay and the viewer.
//!
//! Streaming messages are UTF-8 JSON text frames tagged by a `type` field
//! (`error`, `status` or `frame`). Negotiation uses plain JSON request and
//! response bodies.

pub mod address;
pub mod errors;
pub mod message;
pub mod negotiation;

pub use address::CameraAddress;
pub use errors::ProtocolError;
pub use message::{Detection, MAX_MESSAGE_BYTES, StreamMessage};
pub use negotiation::{
    DEFAULT_WS_PORT, ErrorBody, INVALID_ADDRESS_MESSAGE, NegotiateRequest, NegotiateResponse,
    Scheme, TransportDescriptor, WsProtocol,
};
