use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Invalid IP address format")]
    InvalidAddress,

    #[error("Sign in to start a stream session")]
    AuthRequired,

    #[error("Negotiation failed with status {status}: {message}")]
    Negotiation { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid frame image: {0}")]
    FrameDecode(#[from] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(
            ViewerError::InvalidAddress.to_string(),
            "Invalid IP address format"
        );
        assert_eq!(
            ViewerError::Negotiation {
                status: 500,
                message: "boom".to_string()
            }
            .to_string(),
            "Negotiation failed with status 500: boom"
        );
    }
}
