//! Error types for ordx-executor.

use thiserror::Error;

/// Executor errors. Intent rejections travel as `RejectReason` values in
/// outcomes; these are failures of the machinery itself.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] ordx_ledger::LedgerError),

    #[error("Gate error: {0}")]
    Gate(#[from] ordx_gates::GateError),

    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Label decode error: {0}")]
    LabelDecode(String),
}

/// Result type alias for executor operations.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
