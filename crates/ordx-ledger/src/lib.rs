//! Durable intent ledger and trade-id registry.
//!
//! Everything the process would need to reconstruct its dispatch state
//! after a crash lives behind this crate: the append-only intent WAL,
//! its startup replay, and the write-once trade-id set.

pub mod error;
pub mod record;
pub mod replay;
pub mod trade_registry;
pub mod wal;

pub use error::{LedgerError, LedgerResult};
pub use record::{WalRecord, WAL_SCHEMA_VERSION};
pub use replay::{replay_latest, ReplaySummary};
pub use trade_registry::{TradeIdInsertOutcome, TradeIdRecord, TradeIdRegistry};
pub use wal::{IntentWal, WalConfig};
