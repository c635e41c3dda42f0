//! JSON-RPC over HTTP implementation of [`Ledger`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::types::{
    decode_response, Commitment, LatestBlockhash, RpcRequest, SendTransactionConfig, WithContext,
};
use crate::Ledger;

/// Solana JSON-RPC client.
///
/// Every call is a single attempt; callers decide whether to retry.
pub struct RpcClient {
    endpoint: Url,
    http: reqwest::Client,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `rpc_url`.
    ///
    /// When `api_key` is present and non-empty it is appended as the
    /// `api-key` query parameter, the scheme used by hosted RPC providers.
    pub fn new(
        rpc_url: &str,
        api_key: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, RpcError> {
        let mut endpoint =
            Url::parse(rpc_url).map_err(|e| RpcError::InvalidUrl(format!("{rpc_url}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RpcError::InvalidUrl(format!(
                "{rpc_url}: unsupported scheme {}",
                endpoint.scheme()
            )));
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            endpoint.query_pairs_mut().append_pair("api-key", key);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            endpoint,
            http: builder.build()?,
            commitment: Commitment::Finalized,
            next_id: AtomicU64::new(1),
        })
    }

    /// Host part of the endpoint, safe to log.
    pub fn host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }

    #[cfg(test)]
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, host = self.host(), "RPC request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Some providers wrap JSON-RPC errors in non-2xx responses.
            return match decode_response::<Value>(&body) {
                Err(err @ RpcError::Rpc { .. }) => Err(err),
                _ => Err(RpcError::Transport(format!("HTTP status {status}"))),
            };
        }

        decode_response(&body)
    }
}

/// Decode a Base58 blockhash into its 32 raw bytes.
pub fn decode_blockhash(encoded: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| RpcError::Decode(format!("blockhash {encoded}: {e}")))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        RpcError::Decode(format!("blockhash {encoded}: expected 32 bytes, got {}", v.len()))
    })
}

#[async_trait]
impl Ledger for RpcClient {
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let out: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;

        tracing::debug!(
            slot = out.context.slot,
            blockhash = %out.value.blockhash,
            last_valid_block_height = out.value.last_valid_block_height,
            "Fetched latest blockhash"
        );
        decode_blockhash(&out.value.blockhash)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let config = SendTransactionConfig {
            encoding: "base64",
            skip_preflight: false,
            preflight_commitment: self.commitment,
        };
        self.call("sendTransaction", json!([B64.encode(wire), config]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_appended_as_query_parameter() {
        let client =
            RpcClient::new("https://mainnet.helius-rpc.com/", Some("k3y"), None).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://mainnet.helius-rpc.com/?api-key=k3y"
        );
        assert_eq!(client.host(), "mainnet.helius-rpc.com");
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let client = RpcClient::new("https://api.mainnet-beta.solana.com", Some(""), None).unwrap();
        assert_eq!(client.endpoint().query(), None);
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            RpcClient::new("not a url", None, None),
            Err(RpcError::InvalidUrl(_))
        ));
        assert!(matches!(
            RpcClient::new("ftp://example.com", None, None),
            Err(RpcError::InvalidUrl(_))
        ));
    }

    #[test]
    fn blockhash_decodes_to_32_bytes() {
        let bytes = decode_blockhash("11111111111111111111111111111111").unwrap();
        assert_eq!(bytes, [0u8; 32]);
        assert!(decode_blockhash("1").is_err());
        assert!(decode_blockhash("0OIl").is_err());
    }
}
