//! Lighter transaction CLI
//!
//! Offline tooling around the transaction engine: inspect configuration,
//! preview digests and L1 messages, sign L1 messages, query nonces.

use clap::{Parser, Subcommand};
use lighter_signer::compose::Composer;
use lighter_signer::config::{Credentials, EngineConfig};
use lighter_signer::crypto::{Blake3FieldHasher, ExternalSigner, L1Wallet};
use lighter_signer::transport::{HttpTransport, NonceSource};
use lighter_signer::tx::{build_and_validate, Transaction, TxRequest};
use lighter_signer::{Error, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lighter-tx")]
#[command(about = "Build, hash and sign Lighter L2 transactions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show effective configuration
    Config,

    /// Validate a request and print its Blake3 reference digest and L1 message.
    /// The exchange verifies a Poseidon2 digest, which this command does not produce.
    Digest {
        /// JSON file holding a transaction request
        #[arg(short, long)]
        request: PathBuf,

        /// Nonce to bind
        #[arg(short, long)]
        nonce: i64,

        /// Absolute expiry in ms; defaults to now + tx_ttl_ms
        #[arg(long)]
        expired_at: Option<i64>,
    },

    /// Sign the L1 message of a request with LIGHTER_ETH_PRIVATE_KEY
    L1Sign {
        /// JSON file holding a transaction request
        #[arg(short, long)]
        request: PathBuf,

        /// Nonce to bind
        #[arg(short, long)]
        nonce: i64,

        /// Absolute expiry in ms; defaults to now + tx_ttl_ms
        #[arg(long)]
        expired_at: Option<i64>,
    },

    /// Query the server's next nonce for the configured identity
    Nonce,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    if cli.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            let credentials = Credentials::from_env();
            let report = json!({
                "config": config,
                "chain_id": config.resolved_chain_id(),
                "api_url": config.resolved_api_url(),
                "ws_url": config.network.ws_url(),
                "eth_key_configured": credentials.has_eth_key(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Digest {
            request,
            nonce,
            expired_at,
        } => {
            run_digest(&config, &request, nonce, expired_at)?;
        }
        Commands::L1Sign {
            request,
            nonce,
            expired_at,
        } => {
            run_l1_sign(&config, &request, nonce, expired_at)?;
        }
        Commands::Nonce => {
            run_nonce(&config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let base = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    base.apply_env_with(|name| std::env::var(name).ok())
}

fn build_transaction(
    config: &EngineConfig,
    request_path: &Path,
    nonce: i64,
    expired_at: Option<i64>,
) -> Result<Transaction> {
    let raw = std::fs::read_to_string(request_path).map_err(|e| {
        Error::Config(format!("failed to read {}: {}", request_path.display(), e))
    })?;
    let request: TxRequest = serde_json::from_str(&raw)?;

    let expired_at = expired_at
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() + config.tx_ttl_ms);
    let draft = build_and_validate(request, config.identity(), expired_at, &config.bounds)?;
    let tx = draft.with_nonce(nonce, &config.bounds)?;
    tx.validate(&config.bounds)?;
    Ok(tx)
}

fn run_digest(
    config: &EngineConfig,
    request_path: &Path,
    nonce: i64,
    expired_at: Option<i64>,
) -> Result<()> {
    let tx = build_transaction(config, request_path, nonce, expired_at)?;
    let composer = Composer::new(Arc::new(Blake3FieldHasher), config.bounds.clone());
    let chain_id = config.resolved_chain_id();

    let digest = composer.digest(&tx, chain_id)?;
    let report = json!({
        "kind": tx.kind().to_string(),
        "tx_type": tx.kind().as_u8(),
        "chain_id": chain_id,
        "nonce": tx.nonce(),
        "expired_at": tx.header().expired_at,
        "signatures_required": tx.signature_requirement().count(),
        "reference_digest": digest,
        "reference_hasher": "blake3",
        "submittable": false,
        "l1_message": composer.l1_message(&tx, chain_id),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_l1_sign(
    config: &EngineConfig,
    request_path: &Path,
    nonce: i64,
    expired_at: Option<i64>,
) -> Result<()> {
    let tx = build_transaction(config, request_path, nonce, expired_at)?;
    let credentials = Credentials::from_env();
    let wallet = L1Wallet::from_hex(credentials.eth_private_key()?)?;
    let composer = Composer::new(Arc::new(Blake3FieldHasher), config.bounds.clone());
    let chain_id = config.resolved_chain_id();

    let signature = composer.sign_external(&tx, chain_id, &wallet)?;
    let message = composer.l1_message(&tx, chain_id).unwrap_or_default();
    let recovered = wallet.recover_address(&message, &signature)?;

    tracing::info!(
        kind = %tx.kind(),
        address = %wallet.address(),
        "signed L1 message"
    );

    let report = json!({
        "kind": tx.kind().to_string(),
        "message": message,
        "signature": signature.to_hex(),
        "address": wallet.address_string(),
        "recovered": recovered.to_checksum(None),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_nonce(config: &EngineConfig) -> Result<()> {
    let transport = HttpTransport::new(config.resolved_api_url())?;
    let identity = config.identity();
    let nonce = transport.fetch_nonce(identity).await?;

    let report = json!({
        "account_index": identity.account_index,
        "api_key_index": identity.api_key_index,
        "next_nonce": nonce,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
