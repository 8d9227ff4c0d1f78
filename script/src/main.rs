//! Privacy pool operator CLI.
//!
//! Subcommands:
//!   init     - Write deployment records for a chain (deployments.json, interface.json)
//!   keys     - Generate a deposit/withdrawal key pair
//!   signals  - Assemble the public signals a withdrawal proof must commit to
//!   config   - Print the effective pool configuration

use alloy_primitives::{Address, U256};
use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use privacy_pool_lib::deployment::{derive_address, pool_interface, DeploymentBook};
use privacy_pool_lib::{
    compute_nullifier_hash, generate_keys, Field, KeccakHasher, PublicSignals, SignalDigestGate,
    WithdrawalKey,
};
use privacy_pool_script::{load_config, setup_logger};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Auxiliary tokens deployed next to every pool.
const TOKENS: [&str; 3] = ["USDC", "USDT", "DAI"];

#[derive(Parser)]
#[command(name = "privacy-pool")]
#[command(about = "Operator tooling for the privacy pool")]
struct Cli {
    /// JSON pool config; env vars override its fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a deployment for a chain and write the interface description
    Init {
        #[arg(long, env = "CHAIN_ID", default_value = "31337")]
        chain_id: u64,
        /// Deployer address the pool and token addresses are derived from
        #[arg(long, env = "DEPLOYER")]
        deployer: Address,
        /// Directory holding deployments.json and interface.json
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Generate a deposit/withdrawal key pair
    Keys {
        /// Asset address; the zero address is the native asset
        #[arg(long, default_value_t = Address::ZERO)]
        asset: Address,
        #[arg(long)]
        amount: U256,
        /// Secret to derive the keys from (random if omitted)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Assemble public signals and a development proof for a withdrawal
    Signals {
        #[arg(long)]
        root: Field,
        /// Raw withdrawal key, 84 bytes hex
        #[arg(long)]
        withdrawal_key: WithdrawalKey,
        #[arg(long)]
        nullifier: Field,
        #[arg(long)]
        recipient: Address,
        #[arg(long)]
        amount: U256,
    },
    /// Print the effective pool configuration
    Config,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeysOutput {
    secret: String,
    deposit_key: String,
    withdrawal_key: String,
    /// Leaf the deposit will insert
    leaf: Field,
}

fn main() -> Result<()> {
    setup_logger();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { chain_id, deployer, out_dir } => {
            let deployments = out_dir.join("deployments.json");
            let interface = out_dir.join("interface.json");

            let core = derive_address(deployer, "pool");
            let tokens: Vec<(&str, Address)> =
                TOKENS.iter().map(|symbol| (*symbol, derive_address(deployer, symbol))).collect();

            let mut book = DeploymentBook::load_or_default(&deployments)?;
            book.upsert(chain_id, core, tokens);
            book.save(&deployments)?;
            info!(chain_id, %core, "deployment recorded");

            println!("[{chain_id}] Pool:       {core}");
            if let Some(entry) = book.get(chain_id) {
                for (symbol, address) in &entry.address_and_tokens {
                    if symbol != "address" {
                        println!("[{chain_id}] {:<11} {address}", format!("{}:", symbol.to_uppercase()));
                    }
                }
            }
            println!("[{chain_id}] Deployments written to {}", deployments.display());
            if pool_interface().write_if_absent(&interface)? {
                println!("[{chain_id}] Interface written to {}", interface.display());
            } else {
                println!("[{chain_id}] Interface already present at {}", interface.display());
            }
        }
        Commands::Keys { asset, amount, secret } => {
            let secret = secret.unwrap_or_else(|| {
                rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
            });
            let hasher = KeccakHasher;
            let (deposit_key, withdrawal_key) =
                generate_keys(&hasher, asset, amount, secret.as_bytes())?;
            let output = KeysOutput {
                leaf: deposit_key.standardize(&hasher)?,
                secret,
                deposit_key: deposit_key.to_string(),
                withdrawal_key: withdrawal_key.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Signals { root, withdrawal_key, nullifier, recipient, amount } => {
            let hasher = KeccakHasher;
            ensure!(
                amount <= config.policy().max_withdrawal_on_amount(withdrawal_key.amount),
                "amount {amount} exceeds the withdrawal cap for this key"
            );
            let signals = PublicSignals::assemble(
                root,
                withdrawal_key.standardize(&hasher)?,
                compute_nullifier_hash(&hasher, nullifier),
                recipient,
                amount,
            )?;
            let proof = SignalDigestGate::prove(&signals);
            for (i, signal) in signals.as_slice().iter().enumerate() {
                println!("signal[{i}]: {signal}");
            }
            println!("packed:    0x{}", hex::encode(signals.to_be_bytes()));
            println!("{}", serde_json::to_string_pretty(&proof).context("encoding proof")?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
