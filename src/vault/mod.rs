pub mod reader;
pub mod writer;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol;
use async_trait::async_trait;

use crate::error::AppResult;

pub use reader::VaultReader;
pub use writer::VaultWriter;

/// Decimals of the token held by the vault (peUSDC).
pub const ALLOWANCE_DECIMALS: u8 = 18;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IAgentVault {
        /// Amount the vault currently authorizes an agent to withdraw
        function allowances(address agent) external view returns (uint256);

        /// Withdraw exactly `amount` of the authorized balance
        function claimUSDC(uint256 amount) external;
    }
}

/// Read-only vault queries. No side effects; safe to call unboundedly often.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current claimable allowance for `agent`. Zero means nothing claimable.
    async fn get_allowance(&self, agent: Address) -> AppResult<U256>;
}

/// Signs and broadcasts claim transactions.
///
/// INVARIANTS:
/// - `submit_claim` must not retry internally; retry policy belongs to the keeper
/// - `await_confirmation` must return within a bounded wait
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Sign and broadcast `claimUSDC(amount)`, returning the transaction hash.
    async fn submit_claim(&self, amount: U256) -> AppResult<TxHash>;

    /// Suspend until the transaction is observed included in a block, or fail
    /// with a timeout/revert classification.
    async fn await_confirmation(&self, tx_hash: TxHash) -> AppResult<()>;
}
