//! HTTP client for the Lulo (FlexLend) API.
//!
//! Endpoints:
//! - POST /generate/account/deposit?priorityFee=N
//! - POST /generate/account/withdraw?priorityFee=N
//! - GET  /account

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::types::{
    AccountSummary, DataEnvelope, DepositRequest, TransactionMeta, TransactionMetaList,
    WithdrawRequest,
};
use crate::LendingApi;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.flexlend.fi";

const WALLET_HEADER: &str = "x-wallet-pubkey";
const API_KEY_HEADER: &str = "x-api-key";

/// Longest error body we carry into an error message.
const MAX_ERROR_BODY: usize = 512;

/// Knobs that do not identify the caller.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Forwarded as the `priorityFee` query parameter on generate calls.
    pub priority_fee: Option<u64>,
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            priority_fee: None,
            timeout: None,
        }
    }
}

/// Lulo API client bound to one wallet.
pub struct LuloClient {
    base_url: String,
    wallet: String,
    priority_fee: Option<u64>,
    headers: HeaderMap,
    http: reqwest::Client,
}

impl LuloClient {
    /// Fails with [`ApiError::MissingApiKey`] before any network activity
    /// when no API key is configured.
    pub fn new(
        api_key: Option<&SecretString>,
        wallet: &str,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let api_key = api_key
            .map(|k| k.expose_secret())
            .filter(|k| !k.trim().is_empty())
            .ok_or(ApiError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            WALLET_HEADER,
            HeaderValue::from_str(wallet).map_err(|_| ApiError::InvalidHeader(WALLET_HEADER))?,
        );
        let mut key_value =
            HeaderValue::from_str(api_key).map_err(|_| ApiError::InvalidHeader(API_KEY_HEADER))?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            wallet: wallet.to_string(),
            priority_fee: options.priority_fee,
            headers,
            http: builder.build()?,
        })
    }

    /// The wallet address sent in `x-wallet-pubkey`.
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    async fn generate<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<TransactionMeta>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, priority_fee = ?self.priority_fee, "Making API request");

        let mut request = self.http.post(&url).headers(self.headers.clone()).json(body);
        if let Some(fee) = self.priority_fee {
            request = request.query(&[("priorityFee", fee)]);
        }

        let list: DataEnvelope<TransactionMetaList> = read_json(request.send().await?).await?;
        tracing::info!(
            transaction_count = list.data.transaction_meta.len(),
            "Received transactions from API"
        );
        Ok(list.data.transaction_meta)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(status_code = status.as_u16(), "Unexpected status code");
        let mut body = body;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl LendingApi for LuloClient {
    async fn generate_deposit(
        &self,
        request: &DepositRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError> {
        tracing::info!(
            owner = %request.owner,
            mint_address = %request.mint_address,
            deposit_amount = %request.deposit_amount,
            "Creating deposit request"
        );
        self.generate("/generate/account/deposit", request).await
    }

    async fn generate_withdraw(
        &self,
        request: &WithdrawRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError> {
        tracing::info!(
            owner = %request.owner,
            mint_address = %request.mint_address,
            withdraw_amount = %request.withdraw_amount,
            withdraw_all = request.withdraw_all,
            "Creating withdraw request"
        );
        self.generate("/generate/account/withdraw", request).await
    }

    async fn account(&self) -> Result<AccountSummary, ApiError> {
        let url = format!("{}/account", self.base_url);
        tracing::info!(wallet = %self.wallet, "Fetching account information");

        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;
        let envelope: DataEnvelope<AccountSummary> = read_json(response).await?;
        let account = envelope.data;

        tracing::info!(
            total_value = account.total_value,
            interest_earned = account.interest_earned,
            realtime_apy = account.realtime_apy,
            "Account overview"
        );
        tracing::debug!(
            owner = %account.settings.owner,
            allowed_protocols = ?account.settings.allowed_protocols,
            homebase = ?account.settings.homebase,
            minimum_rate = account.settings.minimum_rate,
            "Account settings"
        );
        Ok(account)
    }
}
