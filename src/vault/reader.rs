use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, AppResult, ChainError};
use crate::vault::{ChainReader, IAgentVault};

/// Read-only client for the vault contract.
///
/// Holds one HTTP provider for the process lifetime; the transport handles
/// connection reuse across poll cycles.
pub struct VaultReader {
    vault: Address,
    provider: DynProvider,
}

impl VaultReader {
    pub fn connect(rpc_url: &str, vault: Address) -> AppResult<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self { vault, provider })
    }
}

#[async_trait]
impl ChainReader for VaultReader {
    async fn get_allowance(&self, agent: Address) -> AppResult<U256> {
        let contract = IAgentVault::new(self.vault, self.provider.clone());

        let allowance = contract
            .allowances(agent)
            .call()
            .await
            .map_err(|e| ChainError::Read(e.to_string()))?;

        debug!("Vault {} allowance for {}: {}", self.vault, agent, allowance);

        Ok(allowance)
    }
}
