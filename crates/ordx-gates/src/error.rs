//! Error types for ordx-gates.

use thiserror::Error;

/// Gate pipeline errors. Intent rejections are not errors; they are
/// `RejectReason` values. This covers misuse of the pipeline itself.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid gate configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for gate operations.
pub type GateResult<T> = std::result::Result<T, GateError>;
