//! The deposit, withdraw and account operations behind the CLI commands.

use chain_sol::validate_address;
use lulo_api::{AccountSummary, DepositRequest, LendingApi, TransactionMeta, WithdrawRequest};
use sol_rpc::Ledger;

use crate::assembler::{EncodedEnvelope, TransactionAssembler};
use crate::error::{LuloError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositParams {
    /// Base58 mint address of the token to deposit.
    pub mint: String,
    /// Base units of the token.
    pub amount: u64,
}

impl DepositParams {
    pub fn validate(&self) -> Result<()> {
        validate_mint(&self.mint)?;
        if self.amount == 0 {
            return Err(LuloError::Validation(
                "deposit amount must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawParams {
    pub mint: String,
    pub amount: Option<u64>,
    /// Withdraw the whole position. The amount is ignored when set.
    pub all: bool,
}

impl WithdrawParams {
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_none() && !self.all {
            return Err(LuloError::Validation(
                "either --amount or --all flag must be specified".into(),
            ));
        }
        if self.amount == Some(0) && !self.all {
            return Err(LuloError::Validation(
                "withdraw amount must be greater than zero".into(),
            ));
        }
        validate_mint(&self.mint)
    }
}

fn validate_mint(mint: &str) -> Result<()> {
    validate_address(mint)
        .map_err(|e| LuloError::Validation(format!("invalid mint address {mint}: {e}")))
}

/// Reject the batch unless every envelope targets an allowed protocol.
/// An empty list allows everything.
pub fn check_allowed_protocols(envelopes: &[EncodedEnvelope], allowed: &[String]) -> Result<()> {
    if allowed.is_empty() {
        return Ok(());
    }
    for (index, envelope) in envelopes.iter().enumerate() {
        let permitted = allowed
            .iter()
            .any(|p| p.eq_ignore_ascii_case(envelope.protocol.trim()));
        if !permitted {
            return Err(LuloError::Validation(format!(
                "transaction {index} targets protocol '{}', which is not in allowed-protocols ({})",
                envelope.protocol,
                allowed.join(", ")
            )));
        }
    }
    Ok(())
}

/// Generate deposit transactions through the API, then co-sign and submit
/// them. Returns the submitted signatures.
pub async fn deposit<A, L>(
    api: &A,
    assembler: &TransactionAssembler<'_, L>,
    allowed_protocols: &[String],
    params: &DepositParams,
) -> Result<Vec<String>>
where
    A: LendingApi + ?Sized,
    L: Ledger + ?Sized,
{
    params.validate()?;

    let request = DepositRequest {
        owner: assembler.payer_address(),
        mint_address: params.mint.clone(),
        deposit_amount: params.amount.to_string(),
    };
    let metas = api
        .generate_deposit(&request)
        .await
        .map_err(|e| LuloError::from(e).context("failed to generate deposit transactions"))?;

    submit(assembler, allowed_protocols, metas).await
}

/// Generate withdraw transactions through the API, then co-sign and submit
/// them. Returns the submitted signatures.
pub async fn withdraw<A, L>(
    api: &A,
    assembler: &TransactionAssembler<'_, L>,
    allowed_protocols: &[String],
    params: &WithdrawParams,
) -> Result<Vec<String>>
where
    A: LendingApi + ?Sized,
    L: Ledger + ?Sized,
{
    params.validate()?;

    let request = WithdrawRequest {
        owner: assembler.payer_address(),
        mint_address: params.mint.clone(),
        withdraw_amount: params.amount.unwrap_or(0).to_string(),
        withdraw_all: params.all,
    };
    let metas = api
        .generate_withdraw(&request)
        .await
        .map_err(|e| LuloError::from(e).context("failed to generate withdraw transactions"))?;

    submit(assembler, allowed_protocols, metas).await
}

pub async fn account<A: LendingApi + ?Sized>(api: &A) -> Result<AccountSummary> {
    api.account()
        .await
        .map_err(|e| LuloError::from(e).context("failed to fetch account"))
}

async fn submit<L: Ledger + ?Sized>(
    assembler: &TransactionAssembler<'_, L>,
    allowed_protocols: &[String],
    metas: Vec<TransactionMeta>,
) -> Result<Vec<String>> {
    for meta in &metas {
        tracing::debug!(
            protocol = %meta.protocol,
            total = %meta.total.as_ref().map(ToString::to_string).unwrap_or_default(),
            "Generated transaction"
        );
    }

    let envelopes: Vec<EncodedEnvelope> = metas.into_iter().map(EncodedEnvelope::from).collect();
    check_allowed_protocols(&envelopes, allowed_protocols)?;
    assembler.submit_encoded_batch(&envelopes).await
}
