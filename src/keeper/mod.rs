// Claim keeper - the monitor-and-claim control loop
//
// One cycle: read the agent's allowance fresh from the vault, decide, claim,
// wait for inclusion, sleep. The loop is an explicit state machine so every
// transition can be tested in isolation; the single recovery edge for every
// handled failure is "return to Polling and re-read".

use std::time::Duration;

use alloy::primitives::{
    utils::format_units,
    Address, U256,
};
use tracing::{error, info, warn};

use crate::vault::{ChainReader, ChainWriter, ALLOWANCE_DECIMALS};

/// Control-loop state. The observed allowance travels inside `Claiming` so a
/// submission can never use a value that was not just read in the same cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Polling,
    Claiming(U256),
    Terminated,
}

pub struct ClaimKeeper<R, W> {
    reader: R,
    writer: W,
    agent: Address,
    poll_interval: Duration,
}

impl<R: ChainReader, W: ChainWriter> ClaimKeeper<R, W> {
    pub fn new(reader: R, writer: W, agent: Address, poll_interval: Duration) -> Self {
        Self {
            reader,
            writer,
            agent,
            poll_interval,
        }
    }

    /// Run until a claim is confirmed. Read failures, submission failures and
    /// confirmation timeouts are logged and looped past; nothing here is fatal.
    pub async fn run(&self) {
        let mut state = LoopState::Polling;

        loop {
            state = self.step(state).await;

            match state {
                LoopState::Terminated => break,
                // Pacing between poll cycles, bounds request rate against the
                // RPC endpoint. A captured allowance is acted on immediately.
                LoopState::Polling => tokio::time::sleep(self.poll_interval).await,
                LoopState::Claiming(_) => {}
            }
        }
    }

    /// Execute one state transition.
    async fn step(&self, state: LoopState) -> LoopState {
        match state {
            LoopState::Polling => self.poll().await,
            LoopState::Claiming(amount) => self.claim(amount).await,
            LoopState::Terminated => LoopState::Terminated,
        }
    }

    async fn poll(&self) -> LoopState {
        info!("Checking allowance...");

        match self.reader.get_allowance(self.agent).await {
            Ok(allowance) if allowance > U256::ZERO => {
                info!(
                    "🚨 Allowance found: {} peUSDC ({} raw)",
                    display_amount(allowance),
                    allowance
                );
                LoopState::Claiming(allowance)
            }
            Ok(allowance) => {
                info!("💤 No allowance found. (Current: {})", display_amount(allowance));
                LoopState::Polling
            }
            Err(e) => {
                // Transient endpoint trouble; the next cycle retries.
                error!("Allowance read failed: {}", e);
                LoopState::Polling
            }
        }
    }

    async fn claim(&self, amount: U256) -> LoopState {
        info!("🏃 Executing claim for {} peUSDC", display_amount(amount));

        let tx_hash = match self.writer.submit_claim(amount).await {
            Ok(hash) => hash,
            Err(e) => {
                // Nothing was claimed, the allowance is still on-chain and
                // will be re-observed next cycle.
                error!("Claim submission failed: {}", e);
                return LoopState::Polling;
            }
        };

        info!("✅ Transaction sent: {}", tx_hash);
        info!("Waiting for confirmation...");

        match self.writer.await_confirmation(tx_hash).await {
            Ok(()) => {
                info!("🎉 Claim confirmed, {} peUSDC secured", display_amount(amount));
                LoopState::Terminated
            }
            Err(e) => {
                // Ambiguous: the transaction may still land. The next read is
                // the source of truth for whether the claim went through.
                warn!("Confirmation not observed: {}", e);
                LoopState::Polling
            }
        }
    }
}

/// Render a raw allowance in whole-token units for log lines.
fn display_amount(value: U256) -> String {
    format_units(value, ALLOWANCE_DECIMALS).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use alloy::primitives::TxHash;
    use async_trait::async_trait;

    use crate::error::{AppResult, ChainError};

    const AGENT: Address = Address::repeat_byte(0x42);

    struct ScriptedReader {
        results: Mutex<VecDeque<Result<U256, ChainError>>>,
    }

    impl ScriptedReader {
        fn new(results: Vec<Result<U256, ChainError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }

        fn reads_remaining(&self) -> usize {
            self.results.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChainReader for ScriptedReader {
        async fn get_allowance(&self, agent: Address) -> AppResult<U256> {
            assert_eq!(agent, AGENT);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra read")
                .map_err(Into::into)
        }
    }

    #[derive(Clone)]
    struct RecordingWriter {
        submitted: Arc<Mutex<Vec<U256>>>,
        submit_results: Arc<Mutex<VecDeque<Result<TxHash, ChainError>>>>,
        confirm_results: Arc<Mutex<VecDeque<Result<(), ChainError>>>>,
    }

    impl RecordingWriter {
        fn new(
            submit_results: Vec<Result<TxHash, ChainError>>,
            confirm_results: Vec<Result<(), ChainError>>,
        ) -> Self {
            Self {
                submitted: Arc::new(Mutex::new(Vec::new())),
                submit_results: Arc::new(Mutex::new(submit_results.into())),
                confirm_results: Arc::new(Mutex::new(confirm_results.into())),
            }
        }

        fn submitted(&self) -> Vec<U256> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainWriter for RecordingWriter {
        async fn submit_claim(&self, amount: U256) -> AppResult<TxHash> {
            self.submitted.lock().unwrap().push(amount);
            self.submit_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra submit")
                .map_err(Into::into)
        }

        async fn await_confirmation(&self, _tx_hash: TxHash) -> AppResult<()> {
            self.confirm_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected confirmation wait")
                .map_err(Into::into)
        }
    }

    fn keeper(
        reader: ScriptedReader,
        writer: RecordingWriter,
    ) -> ClaimKeeper<ScriptedReader, RecordingWriter> {
        ClaimKeeper::new(reader, writer, AGENT, Duration::ZERO)
    }

    fn read_err() -> Result<U256, ChainError> {
        Err(ChainError::Read("connection refused".to_string()))
    }

    #[tokio::test]
    async fn zero_allowance_stays_polling_without_submitting() {
        let writer = RecordingWriter::new(vec![], vec![]);
        let k = keeper(ScriptedReader::new(vec![Ok(U256::ZERO)]), writer.clone());

        let state = k.step(LoopState::Polling).await;

        assert_eq!(state, LoopState::Polling);
        assert!(writer.submitted().is_empty());
    }

    #[tokio::test]
    async fn positive_allowance_submits_exactly_the_observed_value() {
        let amount = U256::from(1_500_000_000_000_000_000u64); // 1.5 in 18-decimal units
        let writer = RecordingWriter::new(vec![Ok(TxHash::repeat_byte(1))], vec![Ok(())]);
        let k = keeper(ScriptedReader::new(vec![Ok(amount)]), writer.clone());

        let state = k.step(LoopState::Polling).await;
        assert_eq!(state, LoopState::Claiming(amount));

        let state = k.step(state).await;
        assert_eq!(state, LoopState::Terminated);
        assert_eq!(writer.submitted(), vec![amount]);
    }

    #[tokio::test]
    async fn submission_failure_returns_to_polling() {
        let amount = U256::from(7u64);
        let writer = RecordingWriter::new(
            vec![Err(ChainError::Submission("insufficient funds for gas".to_string()))],
            vec![],
        );
        let k = keeper(ScriptedReader::new(vec![]), writer.clone());

        let state = k.step(LoopState::Claiming(amount)).await;

        assert_eq!(state, LoopState::Polling);
        assert_eq!(writer.submitted(), vec![amount]);
    }

    #[tokio::test]
    async fn confirmation_timeout_returns_to_polling() {
        let amount = U256::from(10u64);
        let writer = RecordingWriter::new(
            vec![Ok(TxHash::repeat_byte(2))],
            vec![Err(ChainError::ConfirmationTimeout {
                waited: Duration::from_secs(120),
            })],
        );
        let k = keeper(ScriptedReader::new(vec![]), writer.clone());

        let state = k.step(LoopState::Claiming(amount)).await;

        assert_eq!(state, LoopState::Polling);
    }

    #[tokio::test]
    async fn read_failures_never_escape_the_loop() {
        let reader = ScriptedReader::new(vec![read_err(), read_err(), read_err(), Ok(U256::ZERO)]);
        let writer = RecordingWriter::new(vec![], vec![]);
        let k = keeper(reader, writer.clone());

        let mut state = LoopState::Polling;
        for _ in 0..4 {
            state = k.step(state).await;
            assert_eq!(state, LoopState::Polling);
        }

        assert!(writer.submitted().is_empty());
    }

    #[tokio::test]
    async fn three_empty_polls_then_claim_runs_to_termination() {
        let amount = U256::from(1_500_000_000_000_000_000u64);
        let reader = ScriptedReader::new(vec![
            Ok(U256::ZERO),
            Ok(U256::ZERO),
            Ok(U256::ZERO),
            Ok(amount),
        ]);
        let writer = RecordingWriter::new(vec![Ok(TxHash::repeat_byte(3))], vec![Ok(())]);
        let k = keeper(reader, writer.clone());

        k.run().await;

        assert_eq!(writer.submitted(), vec![amount]);
        assert_eq!(k.reader.reads_remaining(), 0);
    }

    #[tokio::test]
    async fn timed_out_claim_that_actually_landed_is_not_resubmitted() {
        let amount = U256::from(500u64);
        let reader = ScriptedReader::new(vec![Ok(amount), Ok(U256::ZERO), Ok(U256::ZERO)]);
        let writer = RecordingWriter::new(
            vec![Ok(TxHash::repeat_byte(4))],
            vec![Err(ChainError::ConfirmationTimeout {
                waited: Duration::from_secs(120),
            })],
        );
        let k = keeper(reader, writer.clone());

        let mut state = LoopState::Polling;
        state = k.step(state).await;
        assert_eq!(state, LoopState::Claiming(amount));

        // Timeout: the transaction may still have been mined.
        state = k.step(state).await;
        assert_eq!(state, LoopState::Polling);

        // It was: subsequent reads report zero and the keeper keeps polling
        // without ever touching the writer again.
        state = k.step(state).await;
        assert_eq!(state, LoopState::Polling);
        state = k.step(state).await;
        assert_eq!(state, LoopState::Polling);
        assert_eq!(writer.submitted(), vec![amount]);
    }

    #[test]
    fn display_amount_renders_whole_token_units() {
        let raw = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(display_amount(raw), "1.500000000000000000");
        assert_eq!(display_amount(U256::ZERO), "0.000000000000000000");
    }
}
