use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_WS_PORT: u16 = 8765;

pub const INVALID_ADDRESS_MESSAGE: &str = "Invalid IP address format";

/// Scheme the negotiation request arrived over, as reported by the
/// forwarded-protocol indicator (`x-forwarded-proto`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Only the exact value `https` counts as secure; anything else, including
    /// an absent header, is treated as plain HTTP.
    pub fn from_forwarded_proto(value: Option<&str>) -> Self {
        match value {
            Some("https") => Scheme::Https,
            _ => Scheme::Http,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsProtocol {
    Ws,
    Wss,
}

impl WsProtocol {
    pub fn for_scheme(scheme: Scheme) -> Self {
        if scheme.is_secure() {
            WsProtocol::Wss
        } else {
            WsProtocol::Ws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WsProtocol::Ws => "ws",
            WsProtocol::Wss => "wss",
        }
    }
}

impl fmt::Display for WsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /negotiate`.
///
/// `ip_address` stays a plain string here; shape validation happens in the
/// negotiator so a bad address maps to 400 rather than a body parse failure.
/// A non-string value is kept as its JSON text, which never passes that check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateRequest {
    #[serde(default, deserialize_with = "address_text")]
    pub ip_address: Option<String>,
}

fn address_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

impl NegotiateRequest {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
        }
    }
}

/// Successful negotiation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    pub success: bool,
    pub message: String,
    pub ip_address: String,
    pub instructions: String,
    pub ws_port: u16,
    pub ws_protocol: WsProtocol,
    pub security_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Connection parameters handed to the stream consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDescriptor {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub instructions: String,
    /// Empty unless `secure` is set.
    pub security_note: String,
}

impl TransportDescriptor {
    pub fn protocol(&self) -> WsProtocol {
        if self.secure {
            WsProtocol::Wss
        } else {
            WsProtocol::Ws
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol(), self.host, self.port)
    }
}

impl From<NegotiateResponse> for TransportDescriptor {
    fn from(response: NegotiateResponse) -> Self {
        Self {
            host: response.ip_address,
            port: response.ws_port,
            secure: response.ws_protocol == WsProtocol::Wss,
            instructions: response.instructions,
            security_note: response.security_note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_proto_only_https_is_secure() {
        assert_eq!(Scheme::from_forwarded_proto(Some("https")), Scheme::Https);
        assert_eq!(Scheme::from_forwarded_proto(Some("http")), Scheme::Http);
        assert_eq!(Scheme::from_forwarded_proto(Some("HTTPS")), Scheme::Http);
        assert_eq!(Scheme::from_forwarded_proto(None), Scheme::Http);
    }

    #[test]
    fn request_uses_camel_case_field() {
        let req: NegotiateRequest = serde_json::from_str(r#"{"ipAddress":"10.0.0.2"}"#).unwrap();
        assert_eq!(req.ip_address.as_deref(), Some("10.0.0.2"));

        let empty: NegotiateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.ip_address, None);

        let null: NegotiateRequest = serde_json::from_str(r#"{"ipAddress":null}"#).unwrap();
        assert_eq!(null.ip_address, None);
    }

    #[test]
    fn request_keeps_non_string_address_as_json_text() {
        let number: NegotiateRequest = serde_json::from_str(r#"{"ipAddress":123}"#).unwrap();
        assert_eq!(number.ip_address.as_deref(), Some("123"));

        let list: NegotiateRequest =
            serde_json::from_str(r#"{"ipAddress":["10.0.0.2"]}"#).unwrap();
        assert_eq!(list.ip_address.as_deref(), Some(r#"["10.0.0.2"]"#));
    }

    #[test]
    fn response_round_trips_wire_names() {
        let json = r#"{"success":true,"message":"IP address validated","ipAddress":"192.168.1.100","instructions":"run it","wsPort":8765,"wsProtocol":"wss","securityNote":"use TLS"}"#;
        let response: NegotiateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.ws_protocol, WsProtocol::Wss);
        assert_eq!(serde_json::to_string(&response).unwrap(), json);
    }

    #[test]
    fn descriptor_builds_url_from_response() {
        let descriptor = TransportDescriptor::from(NegotiateResponse {
            success: true,
            message: "IP address validated".to_string(),
            ip_address: "192.168.1.100".to_string(),
            instructions: String::new(),
            ws_port: DEFAULT_WS_PORT,
            ws_protocol: WsProtocol::Ws,
            security_note: String::new(),
        });

        assert!(!descriptor.secure);
        assert_eq!(descriptor.url(), "ws://192.168.1.100:8765");

        let secure = TransportDescriptor {
            secure: true,
            ..descriptor
        };
        assert_eq!(secure.url(), "wss://192.168.1.100:8765");
    }
}
