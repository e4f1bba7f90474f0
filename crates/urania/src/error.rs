use crate::ephemeris::OracleError;
use thiserror::Error;

/// Errors that abort a detection run. No partial results accompany them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Position oracle failed: {0}")]
    OracleFailure(#[from] OracleError),

    #[error("{stage} did not converge within {iterations} iterations")]
    NumericalDegenerate {
        stage: &'static str,
        iterations: usize,
    },

    #[error("Detection worker failed: {0}")]
    WorkerFailed(String),
}
