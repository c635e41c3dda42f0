use thiserror::Error;

/// Errors from the Lulo HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Lulo API key is not configured")]
    MissingApiKey,

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("Lulo API request failed: {0}")]
    Transport(String),

    #[error("Lulo API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode Lulo API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status() {
        let err = ApiError::Status {
            status: 500,
            body: "internal error".into(),
        };
        assert_eq!(
            err.to_string(),
            "Lulo API returned status 500: internal error"
        );
    }

    #[test]
    fn display_missing_api_key() {
        assert_eq!(
            ApiError::MissingApiKey.to_string(),
            "Lulo API key is not configured"
        );
    }
}
