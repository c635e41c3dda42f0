//! Minimal Solana JSON-RPC client.
//!
//! Only the two calls a signing client needs: fetch a recent blockhash and
//! submit a signed transaction. The [`Ledger`] trait is the seam callers
//! program against so the transport can be swapped out in tests.

use async_trait::async_trait;

pub mod client;
pub mod error;
pub mod types;

pub use client::{decode_blockhash, RpcClient};
pub use error::RpcError;
pub use types::Commitment;

/// A remote ledger that hands out blockhashes and accepts transactions.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Recent blockhash at `finalized` commitment.
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Submit full transaction wire bytes with preflight enabled. Returns the
    /// transaction signature reported by the node (Base58).
    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;
}
