use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed stream message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Stream message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid IP address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = ProtocolError::TooLarge {
            size: 10,
            limit: 4,
        };
        assert_eq!(
            err.to_string(),
            "Stream message of 10 bytes exceeds the 4 byte limit"
        );

        assert_eq!(
            ProtocolError::InvalidAddress.to_string(),
            "Invalid IP address format",
            "InvalidAddress should match the negotiation error body"
        );
    }

    #[test]
    fn test_error_conversion_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ProtocolError = json_err.into();
        assert!(matches!(err, ProtocolError::Malformed(_)));
        assert!(err.to_string().starts_with("Malformed stream message:"));
    }
}
