//! JSON-RPC 2.0 envelopes and the Solana method payloads we use.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// Commitment level for reads and preflight simulation. Only `finalized`
/// is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Finalized,
}

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorObject> for RpcError {
    fn from(obj: RpcErrorObject) -> Self {
        // Preflight failures carry the simulation logs in `data.logs`.
        let logs = obj
            .data
            .as_ref()
            .and_then(|d| d.get("logs"))
            .and_then(Value::as_array)
            .map(|logs| {
                logs.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .filter(|joined| !joined.is_empty());

        let message = match logs {
            Some(logs) => format!("{} (logs: {logs})", obj.message),
            None => obj.message,
        };
        RpcError::Rpc {
            code: obj.code,
            message,
        }
    }
}

/// Decode a JSON-RPC response body into its `result`.
pub(crate) fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, RpcError> {
    let response: RpcResponse<T> =
        serde_json::from_str(body).map_err(|e| RpcError::Decode(e.to_string()))?;

    if let Some(err) = response.error {
        return Err(err.into());
    }
    response
        .result
        .ok_or_else(|| RpcError::Decode("response has neither result nor error".into()))
}

/// `{ context, value }` wrapper used by most Solana RPC reads.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub context: ResponseContext,
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContext {
    pub slot: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendTransactionConfig {
    pub encoding: &'static str,
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
}
