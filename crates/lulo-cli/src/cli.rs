//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use lulo_core::{BlockhashRefresh, ConfigLayer, LuloConfig, Result};

#[derive(Debug, Parser)]
#[command(name = "lulo", version, about = "Deposit into and withdraw from Lulo lending on Solana")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command. Each one can also come from the
/// environment or from the config file.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Config file (TOML). Defaults to ./config.toml when present
    #[arg(long, global = true, env = "LULO_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the Solana keypair file
    #[arg(long, global = true, env = "LULO_KEYPAIR", value_name = "PATH")]
    pub keypair: Option<PathBuf>,

    /// Solana RPC endpoint
    #[arg(long, global = true, env = "LULO_RPC_URL", value_name = "URL")]
    pub rpc_url: Option<String>,

    /// API key appended to the RPC endpoint
    #[arg(long, global = true, env = "LULO_RPC_API_KEY", hide_env_values = true)]
    pub rpc_api_key: Option<String>,

    /// Lulo API key
    #[arg(long, global = true, env = "LULO_API_KEY", hide_env_values = true)]
    pub lulo_api_key: Option<String>,

    /// Lulo API base URL
    #[arg(long, global = true, env = "LULO_API_URL", value_name = "URL")]
    pub lulo_api_url: Option<String>,

    /// Priority fee forwarded to the Lulo API
    #[arg(long, global = true, env = "LULO_PRIORITY_FEE")]
    pub priority_fee: Option<u64>,

    /// Protocols generated transactions may target (comma separated)
    #[arg(
        long,
        global = true,
        env = "LULO_ALLOWED_PROTOCOLS",
        value_delimiter = ',',
        value_name = "PROTOCOLS"
    )]
    pub allowed_protocols: Vec<String>,

    /// Fetch one blockhash per batch or one per transaction
    #[arg(long, global = true, env = "LULO_BLOCKHASH_REFRESH", value_name = "batch|transaction")]
    pub blockhash_refresh: Option<BlockhashRefresh>,

    /// HTTP timeout for the Lulo API and the RPC node
    #[arg(long, global = true, env = "LULO_REQUEST_TIMEOUT_SECS", value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "LULO_LOG", default_value = "info")]
    pub log_level: String,
}

impl GlobalArgs {
    /// Environment and flags as one layer (clap already merged the two).
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            keypair: self.keypair.clone(),
            rpc_url: self.rpc_url.clone(),
            rpc_api_key: self.rpc_api_key.clone(),
            lulo_api_key: self.lulo_api_key.clone(),
            lulo_api_url: self.lulo_api_url.clone(),
            priority_fee: self.priority_fee,
            allowed_protocols: Some(self.allowed_protocols.clone()),
            blockhash_refresh: self.blockhash_refresh,
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Config file overlaid with environment and flags.
    pub fn resolve(&self) -> Result<LuloConfig> {
        let file = ConfigLayer::discover(self.config.as_deref())?;
        Ok(LuloConfig::from(file.overlay(self.to_layer())))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show account totals and settings
    Account,
    /// Deposit tokens into Lulo
    Deposit {
        /// Amount in base units of the token
        #[arg(short, long)]
        amount: u64,
        /// Token mint address
        #[arg(short, long)]
        mint: String,
    },
    /// Withdraw tokens from Lulo
    Withdraw {
        /// Amount in base units of the token
        #[arg(short, long)]
        amount: Option<u64>,
        /// Withdraw the whole position
        #[arg(long)]
        all: bool,
        /// Token mint address
        #[arg(short, long)]
        mint: String,
    },
    /// Print the wallet public key
    Pubkey,
    /// Print the effective configuration with secrets redacted
    Config,
    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the version
    Version,
}
