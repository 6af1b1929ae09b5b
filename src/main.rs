mod config;
mod error;
mod keeper;
mod vault;

use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::AppError;
use crate::keeper::ClaimKeeper;
use crate::vault::{VaultReader, VaultWriter};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,allowance_keeper=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Load configuration
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let signer: PrivateKeySigner = config
        .private_key
        .parse()
        .map_err(|_| AppError::Config("PRIVATE_KEY is not a valid secp256k1 key".to_string()))?;
    let agent = signer.address();

    let vault: Address = config
        .vault_address
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid vault address: {}", e)))?;

    info!("🤖 Keeper initialized for agent: {}", agent);
    info!("🎯 Watching vault: {}", vault);

    let reader = VaultReader::connect(&config.rpc_url, vault)?;
    let writer = VaultWriter::connect(
        &config.rpc_url,
        vault,
        signer,
        Duration::from_secs(config.confirmation_timeout_secs),
    )?;

    let keeper = ClaimKeeper::new(
        reader,
        writer,
        agent,
        Duration::from_secs(config.poll_interval_secs),
    );

    // Runs until a claim is confirmed; every failure path loops back to polling
    keeper.run().await;

    info!("Claim confirmed, shutting down");

    Ok(())
}
