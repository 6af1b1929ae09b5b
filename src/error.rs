use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures crossing the vault reader/writer boundary.
///
/// The keeper never branches on the sub-cause: every handled failure takes the
/// same recovery edge back to polling. The classification exists for logs and
/// for tests that pin down which path produced a failure.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Allowance read failed: {0}")]
    Read(String),

    #[error("Claim submission failed: {0}")]
    Submission(String),

    #[error("Claim transaction reverted: {0}")]
    Reverted(String),

    #[error("No confirmation after {waited:?}")]
    ConfirmationTimeout { waited: Duration },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
