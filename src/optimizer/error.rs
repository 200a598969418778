use thiserror::Error;

/// Errors raised while building, solving or reading back a dispatch model
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Verification failed: {0}")]
    Verification(String),
}
