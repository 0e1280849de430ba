use crate::ViewerError;
use protocol::{CameraAddress, ErrorBody, NegotiateRequest, NegotiateResponse, TransportDescriptor};
use reqwest::StatusCode;

/// Whether the user has a valid signed-in session. Negotiation is not
/// attempted without one.
pub trait SessionCheck {
    fn has_active_session(&self) -> bool;
}

impl SessionCheck for bool {
    fn has_active_session(&self) -> bool {
        *self
    }
}

pub struct NegotiationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NegotiationClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn negotiate(
        &self,
        session: &impl SessionCheck,
        address: &str,
    ) -> Result<TransportDescriptor, ViewerError> {
        if !session.has_active_session() {
            return Err(ViewerError::AuthRequired);
        }

        let address = CameraAddress::parse(address).map_err(|_| ViewerError::InvalidAddress)?;

        let response = self
            .http
            .post(&self.endpoint)
            .json(&NegotiateRequest::new(address.as_str()))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: NegotiateResponse = response.json().await?;
            tracing::info!(
                ip_address = %body.ip_address,
                ws_protocol = %body.ws_protocol,
                ws_port = body.ws_port,
                "Negotiated stream transport"
            );
            return Ok(body.into());
        }

        if status == StatusCode::BAD_REQUEST {
            return Err(ViewerError::InvalidAddress);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(ViewerError::Negotiation {
            status: status.as_u16(),
            message,
        })
    }
}
