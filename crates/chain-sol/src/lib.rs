//! Solana primitives for the Lulo client.
//!
//! This crate handles keypair files, Base58 addresses, and Solana's compact
//! binary transaction wire format (legacy and v0 messages). There is no
//! `solana-sdk` dependency.
//!
//! Ed25519 comes from `ed25519-dalek`, Base58 from `bs58`, and the base64
//! envelope encoding used by HTTP APIs from `base64`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{address_to_bytes, bytes_to_address, signature_to_string, validate_address};
pub use error::SolError;
pub use keypair::Keypair;
pub use transaction::{
    compile_message, decode_compact_u16, encode_compact_u16, transfer_instruction,
    AddressTableLookup, CompiledInstruction, MessageHeader, MessageVersion, SolAccountMeta,
    SolInstruction, SolMessage, SolTransaction, EMPTY_SIGNATURE, SYSTEM_PROGRAM_ID,
};
