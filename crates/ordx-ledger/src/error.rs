//! Error types for ordx-ledger.

use thiserror::Error;

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record parse error: {0}")]
    Parse(String),

    #[error("Record schema violation: {0}")]
    Schema(String),

    /// The bounded append queue is full. Callers must treat this as a
    /// refusal to dispatch, never as something to wait out.
    #[error("WAL append queue full")]
    QueueFull,

    #[error("WAL writer has shut down")]
    WriterClosed,

    #[error("Durability barrier timed out after {0} ms")]
    BarrierTimeout(u64),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
