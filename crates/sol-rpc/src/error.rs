use thiserror::Error;

/// Errors talking to a Solana JSON-RPC node.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object (preflight failure,
    /// blockhash not found, insufficient funds, ...).
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        // The endpoint URL may carry the provider API key.
        RpcError::Transport(e.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rpc_error() {
        let err = RpcError::Rpc {
            code: -32002,
            message: "Transaction simulation failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "RPC error -32002: Transaction simulation failed"
        );
    }

    #[test]
    fn display_invalid_url() {
        let err = RpcError::InvalidUrl("relative URL without a base".into());
        assert!(err.to_string().starts_with("invalid RPC URL"));
    }
}
