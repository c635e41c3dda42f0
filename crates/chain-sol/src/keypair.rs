//! Ed25519 keypairs in the `solana-keygen` JSON file layout.
//!
//! A keypair file holds a JSON array of byte values. The canonical layout is
//! 64 bytes: the 32-byte secret seed followed by the 32-byte public key. A
//! bare 32-byte seed is accepted as well.

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::address::bytes_to_address;
use crate::error::SolError;

/// Length of the `solana-keygen` secret+public layout.
pub const KEYPAIR_LENGTH: usize = 64;

/// Length of a bare Ed25519 secret seed.
pub const SECRET_KEY_LENGTH: usize = 32;

/// A loaded signing keypair.
///
/// The inner `SigningKey` zeroizes its secret on drop.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Parse a keypair from raw bytes (64-byte keypair or 32-byte seed).
    ///
    /// For the 64-byte form the trailing public key must match the one
    /// derived from the seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        let signing_key = match bytes.len() {
            KEYPAIR_LENGTH => {
                let mut full = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                full.copy_from_slice(bytes);
                SigningKey::from_keypair_bytes(&full).map_err(|_| {
                    SolError::InvalidKeypair(
                        "public key half does not match the secret key".into(),
                    )
                })?
            }
            SECRET_KEY_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                seed.copy_from_slice(bytes);
                SigningKey::from_bytes(&seed)
            }
            other => {
                return Err(SolError::InvalidKeypair(format!(
                    "expected {KEYPAIR_LENGTH} or {SECRET_KEY_LENGTH} bytes, got {other}"
                )))
            }
        };

        Ok(Self { signing_key })
    }

    /// Parse the JSON byte-array layout written by `solana-keygen`.
    pub fn from_json(json: &str) -> Result<Self, SolError> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(json)
                .map_err(|e| SolError::InvalidKeypair(format!("not a JSON byte array: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// The 32-byte Ed25519 public key.
    pub fn pubkey(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The public key as a Base58 Solana address.
    pub fn address(&self) -> String {
        bytes_to_address(&self.pubkey())
    }

    /// Sign arbitrary bytes (for transactions: the serialized message).
    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.address())
            .finish_non_exhaustive()
    }
}
