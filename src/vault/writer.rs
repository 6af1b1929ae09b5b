use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ChainError};
use crate::vault::{ChainWriter, IAgentVault};

/// Interval between receipt probes while waiting for inclusion.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Signing client for the vault contract.
pub struct VaultWriter {
    vault: Address,
    provider: DynProvider,
    confirmation_timeout: Duration,
}

impl VaultWriter {
    pub fn connect(
        rpc_url: &str,
        vault: Address,
        signer: PrivateKeySigner,
        confirmation_timeout: Duration,
    ) -> AppResult<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url)
            .erased();

        Ok(Self {
            vault,
            provider,
            confirmation_timeout,
        })
    }
}

#[async_trait]
impl ChainWriter for VaultWriter {
    async fn submit_claim(&self, amount: U256) -> AppResult<TxHash> {
        let contract = IAgentVault::new(self.vault, self.provider.clone());

        // Gas estimation, nonce management and signing all happen here; any of
        // them failing means nothing was claimed and the attempt is safe to
        // retry on the next poll.
        let pending = contract
            .claimUSDC(amount)
            .send()
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        info!("Claim transaction broadcast: {}", tx_hash);

        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> AppResult<()> {
        let deadline = Instant::now() + self.confirmation_timeout;

        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(ChainError::Reverted(format!(
                            "transaction {} included but failed",
                            tx_hash
                        ))
                        .into());
                    }

                    info!(
                        "Transaction {} included in block {:?}",
                        tx_hash, receipt.block_number
                    );
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    // Transient RPC trouble while waiting; keep probing until
                    // the deadline, the receipt may still appear.
                    debug!("Receipt probe for {} failed: {}", tx_hash, e);
                }
            }

            if Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout {
                    waited: self.confirmation_timeout,
                }
                .into());
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
