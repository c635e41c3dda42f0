//! Keypair file loading.
//!
//! The file is the Solana CLI format: a JSON array of 64 byte values
//! (secret seed followed by the public key).

use std::fs;
use std::path::Path;

use chain_sol::Keypair;
use zeroize::Zeroizing;

use crate::config::LuloConfig;
use crate::error::{LuloError, Result};

/// Load the signing keypair named by the `keypair` setting.
pub fn load_keypair(config: &LuloConfig) -> Result<Keypair> {
    let path = config.keypair_path()?;
    let keypair = read_keypair_file(path)?;
    tracing::debug!(path = %path.display(), pubkey = %keypair.address(), "Loaded keypair");
    Ok(keypair)
}

pub fn read_keypair_file(path: &Path) -> Result<Keypair> {
    let content = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
        LuloError::Io(format!("failed to read keypair file {}: {e}", path.display()))
    })?);
    Keypair::from_json(&content)
        .map_err(|e| LuloError::from(e).context(format!("keypair file {}", path.display())))
}
