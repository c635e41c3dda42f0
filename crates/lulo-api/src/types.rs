//! Request and response bodies of the Lulo API.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /generate/account/deposit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub owner: String,
    pub mint_address: String,
    /// Base units as an integer string.
    pub deposit_amount: String,
}

/// Body of `POST /generate/account/withdraw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub owner: String,
    pub mint_address: String,
    /// Ignored by the API when `withdraw_all` is set.
    pub withdraw_amount: String,
    pub withdraw_all: bool,
}

/// Amount fields come back as a JSON number for deposits and as a string
/// for withdrawals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{n}"),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

/// One unsigned transaction generated by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionMeta {
    /// Base64 transaction wire bytes.
    pub transaction: String,
    /// Lending protocol the transaction targets (e.g. `kamino`).
    pub protocol: String,
    #[serde(default, alias = "totalDeposit", alias = "totalWithdraw")]
    pub total: Option<Amount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionMetaList {
    #[serde(default)]
    pub transaction_meta: Vec<TransactionMeta>,
}

/// `GET /account` payload.
///
/// Absent and `null` fields read as zero values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub total_value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub interest_earned: f64,
    #[serde(rename = "realtimeAPY", deserialize_with = "null_as_default")]
    pub realtime_apy: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub settings: AccountSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSettings {
    #[serde(deserialize_with = "null_as_default")]
    pub owner: String,
    pub allowed_protocols: Option<String>,
    pub homebase: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub minimum_rate: f64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
