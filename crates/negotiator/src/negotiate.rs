use protocol::{
    CameraAddress, INVALID_ADDRESS_MESSAGE, NegotiateRequest, NegotiateResponse, Scheme,
    WsProtocol,
};
use thiserror::Error;

pub const VALIDATED_MESSAGE: &str = "IP address validated";

pub const SECURITY_NOTE: &str = "Note: Your app is running in a secure context (HTTPS). \
For WebSocket connections to work properly, your WebSocket server must use secure \
WebSockets (wss://) or be accessed through a secure proxy.";

#[derive(Error, Debug)]
pub enum NegotiateError {
    #[error("{}", INVALID_ADDRESS_MESSAGE)]
    InvalidAddress,

    #[error("{0}")]
    Body(#[from] serde_json::Error),
}

/// Turn a camera address into relay connection parameters.
///
/// Pure: the result depends only on the request, the inbound scheme and the
/// advertised relay port.
pub fn negotiate(
    request: &NegotiateRequest,
    scheme: Scheme,
    ws_port: u16,
) -> Result<NegotiateResponse, NegotiateError> {
    let address = request
        .ip_address
        .as_deref()
        .ok_or(NegotiateError::InvalidAddress)
        .and_then(|raw| CameraAddress::parse(raw).map_err(|_| NegotiateError::InvalidAddress))?;

    let security_note = if scheme.is_secure() {
        SECURITY_NOTE.to_string()
    } else {
        String::new()
    };

    Ok(NegotiateResponse {
        success: true,
        message: VALIDATED_MESSAGE.to_string(),
        instructions: instructions(&address),
        ip_address: address.into(),
        ws_port,
        ws_protocol: WsProtocol::for_scheme(scheme),
        security_note,
    })
}

/// Operator-facing text describing how to start the relay for a camera.
pub fn instructions(address: &CameraAddress) -> String {
    format!(
        "To start the object detection relay for this camera, run:\nRELAY_CAMERA_ADDRESS={address} relay"
    )
}
