//! Core of the Lulo command-line client.
//!
//! Ties the Solana primitives (`chain-sol`), the JSON-RPC ledger client
//! (`sol-rpc`) and the Lulo HTTP API client (`lulo-api`) together:
//!
//! - [`config`]: layered settings (file, environment, flags)
//! - [`credentials`]: keypair file loading
//! - [`assembler`]: build / adopt, sign and submit transactions
//! - [`ops`]: deposit, withdraw and account operations
//!
//! Every fallible function returns [`LuloError`].

pub mod assembler;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ops;

pub use assembler::{EncodedEnvelope, TransactionAssembler};
pub use config::{BlockhashRefresh, ConfigLayer, LuloConfig, DEFAULT_CONFIG_FILE};
pub use credentials::{load_keypair, read_keypair_file};
pub use error::{LuloError, Result};
pub use ops::{DepositParams, WithdrawParams};
