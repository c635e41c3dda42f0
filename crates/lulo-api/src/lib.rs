//! Client for the Lulo lending API.
//!
//! The API generates unsigned deposit/withdraw transactions for a wallet and
//! reports account totals. Signing and submission happen elsewhere; this
//! crate only speaks HTTP + JSON.

use async_trait::async_trait;

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientOptions, LuloClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use types::{
    AccountSettings, AccountSummary, Amount, DepositRequest, TransactionMeta, WithdrawRequest,
};

/// The lending API operations the command layer needs.
#[async_trait]
pub trait LendingApi: Send + Sync {
    /// Unsigned transactions that deposit into Lulo reserves.
    async fn generate_deposit(
        &self,
        request: &DepositRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError>;

    /// Unsigned transactions that withdraw from Lulo reserves.
    async fn generate_withdraw(
        &self,
        request: &WithdrawRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError>;

    /// Totals and settings of the wallet the client is bound to.
    async fn account(&self) -> Result<AccountSummary, ApiError>;
}
