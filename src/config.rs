use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub vault_address: String,
    /// Hex-encoded secp256k1 key for the agent. Never logged.
    pub private_key: String,
    pub poll_interval_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            rpc_url: std::env::var("RPC_URL")
                .unwrap_or_else(|_| "https://sepolia.base.org".to_string()),
            vault_address: std::env::var("VAULT_ADDRESS")
                .unwrap_or_else(|_| "0x9800eA3Fe980766a1E5bf6241068715774776eE0".to_string()),
            private_key: std::env::var("PRIVATE_KEY")
                .map_err(|_| config::ConfigError::NotFound("PRIVATE_KEY".to_string()))?,
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            confirmation_timeout_secs: std::env::var("CONFIRMATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        })
    }
}

// Manual impl so the signing key can never leak through a debug log.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("vault_address", &self.vault_address)
            .field("private_key", &"<redacted>")
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .finish()
    }
}
