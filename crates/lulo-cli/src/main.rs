//! `lulo`: command-line client for Lulo lending on Solana.
//!
//! stdout carries command output only; logs go to stderr.

mod cli;

use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use lulo_api::{ClientOptions, LuloClient};
use lulo_core::ops::{self, DepositParams, WithdrawParams};
use lulo_core::{load_keypair, LuloConfig, LuloError, Result, TransactionAssembler};
use secrecy::ExposeSecret;
use sol_rpc::RpcClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // These two need no configuration at all.
    match cli.command {
        Command::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lulo", &mut io::stdout());
            return Ok(());
        }
        Command::Version => {
            println!("lulo {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let config = cli.global.resolve()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_redacted_toml()?);
        }
        Command::Pubkey => {
            let keypair = load_keypair(&config)?;
            println!("Public Key: {}", keypair.address());
        }
        Command::Account => {
            let keypair = load_keypair(&config)?;
            let api = lulo_client(&config, &keypair.address())?;
            let account = ops::account(&api).await?;
            let rendered = serde_json::to_string_pretty(&account)
                .map_err(|e| LuloError::Parse(format!("failed to render account: {e}")))?;
            println!("{rendered}");
        }
        Command::Deposit { amount, mint } => {
            let keypair = load_keypair(&config)?;
            let api = lulo_client(&config, &keypair.address())?;
            let ledger = rpc_client(&config)?;
            let assembler = TransactionAssembler::new(&keypair, &ledger)
                .with_blockhash_refresh(config.blockhash_refresh);

            let params = DepositParams { mint, amount };
            let signatures =
                ops::deposit(&api, &assembler, &config.allowed_protocols, &params).await?;
            print_signatures(&signatures);
        }
        Command::Withdraw { amount, all, mint } => {
            let params = WithdrawParams { mint, amount, all };
            params.validate()?;

            let keypair = load_keypair(&config)?;
            let api = lulo_client(&config, &keypair.address())?;
            let ledger = rpc_client(&config)?;
            let assembler = TransactionAssembler::new(&keypair, &ledger)
                .with_blockhash_refresh(config.blockhash_refresh);

            let signatures =
                ops::withdraw(&api, &assembler, &config.allowed_protocols, &params).await?;
            print_signatures(&signatures);
        }
        Command::Completion { .. } | Command::Version => {}
    }

    Ok(())
}

fn lulo_client(config: &LuloConfig, wallet: &str) -> Result<LuloClient> {
    let options = ClientOptions {
        base_url: config.lulo_api_url.clone(),
        priority_fee: config.priority_fee,
        timeout: config.request_timeout,
    };
    Ok(LuloClient::new(
        config.lulo_api_key.as_ref(),
        wallet,
        options,
    )?)
}

fn rpc_client(config: &LuloConfig) -> Result<RpcClient> {
    let client = RpcClient::new(
        config.rpc_url()?,
        config.rpc_api_key.as_ref().map(|k| k.expose_secret()),
        config.request_timeout,
    )?;
    tracing::debug!(host = client.host(), "Using RPC endpoint");
    Ok(client)
}

fn print_signatures(signatures: &[String]) {
    for signature in signatures {
        println!("{signature}");
    }
}
