use chain_sol::SolError;
use lulo_api::ApiError;
use sol_rpc::RpcError;
use thiserror::Error;

/// Every failure a command can end with.
///
/// Nothing is retried; the binary prints the message and exits non-zero.
#[derive(Debug, Error)]
pub enum LuloError {
    /// A required setting is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed keypair file, config file, envelope or response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// Transport failure or non-success answer from the Lulo API or the RPC node.
    #[error("network error: {0}")]
    Network(String),

    /// Conflicting or missing command input.
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, LuloError>;

impl LuloError {
    /// Prefix the message with `context`, keeping the error kind.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            LuloError::Configuration(m) => LuloError::Configuration(format!("{context}: {m}")),
            LuloError::Io(m) => LuloError::Io(format!("{context}: {m}")),
            LuloError::Parse(m) => LuloError::Parse(format!("{context}: {m}")),
            LuloError::Network(m) => LuloError::Network(format!("{context}: {m}")),
            LuloError::Validation(m) => LuloError::Validation(format!("{context}: {m}")),
        }
    }
}

impl From<SolError> for LuloError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::InvalidKeypair(_)
            | SolError::InvalidEncoding(_)
            | SolError::SerializationError(_) => LuloError::Parse(e.to_string()),
            SolError::InvalidAddress(_)
            | SolError::TransactionBuildError(_)
            | SolError::SigningError(_) => LuloError::Validation(e.to_string()),
        }
    }
}

impl From<RpcError> for LuloError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::InvalidUrl(_) => LuloError::Configuration(e.to_string()),
            RpcError::Decode(_) => LuloError::Parse(e.to_string()),
            RpcError::Transport(_) | RpcError::Rpc { .. } => LuloError::Network(e.to_string()),
        }
    }
}

impl From<ApiError> for LuloError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::MissingApiKey | ApiError::InvalidHeader(_) => {
                LuloError::Configuration(e.to_string())
            }
            ApiError::Decode(_) => LuloError::Parse(e.to_string()),
            ApiError::Transport(_) | ApiError::Status { .. } => LuloError::Network(e.to_string()),
        }
    }
}
