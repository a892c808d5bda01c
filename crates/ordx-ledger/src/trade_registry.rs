//! Durable trade-id registry for idempotent fill handling.
//!
//! Contract: a trade id is appended to durable storage before any
//! lifecycle or position update derived from it. Replayed or duplicated
//! fill events then collapse to counted no-ops.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ordx_core::{Price, Qty};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::record::{escape_field, unescape_field};

/// One observed fill, keyed by the venue's trade id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIdRecord {
    pub trade_id: String,
    pub group_id: String,
    pub leg_idx: u32,
    pub ts_ms: u64,
    pub qty: Qty,
    pub price: Price,
}

impl TradeIdRecord {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.trade_id.trim().is_empty() {
            return Err(LedgerError::Schema(
                "trade_id must be non-empty".to_string(),
            ));
        }
        if self.group_id.trim().is_empty() {
            return Err(LedgerError::Schema(
                "group_id must be non-empty".to_string(),
            ));
        }
        if self.ts_ms == 0 {
            return Err(LedgerError::Schema("ts_ms must be non-zero".to_string()));
        }
        if !self.qty.is_positive() {
            return Err(LedgerError::Schema("qty must be positive".to_string()));
        }
        if !self.price.is_positive() {
            return Err(LedgerError::Schema("price must be positive".to_string()));
        }
        Ok(())
    }

    fn to_line(&self) -> String {
        format!(
            "trade_id={}|group_id={}|leg_idx={}|ts_ms={}|qty={}|price={}",
            escape_field(&self.trade_id),
            escape_field(&self.group_id),
            self.leg_idx,
            self.ts_ms,
            self.qty,
            self.price,
        )
    }

    fn from_line(line: &str) -> LedgerResult<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for part in line.split('|') {
            if part.trim().is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| LedgerError::Parse(format!("malformed field: {part}")))?;
            fields.insert(key, value);
        }

        let get = |name: &str| -> LedgerResult<&str> {
            fields
                .get(name)
                .copied()
                .ok_or_else(|| LedgerError::Parse(format!("missing field: {name}")))
        };

        let record = TradeIdRecord {
            trade_id: unescape_field(get("trade_id")?)?,
            group_id: unescape_field(get("group_id")?)?,
            leg_idx: get("leg_idx")?
                .parse()
                .map_err(|_| LedgerError::Parse("invalid leg_idx".to_string()))?,
            ts_ms: get("ts_ms")?
                .parse()
                .map_err(|_| LedgerError::Parse("invalid ts_ms".to_string()))?,
            qty: get("qty")?
                .parse()
                .map_err(|_| LedgerError::Parse("invalid qty".to_string()))?,
            price: get("price")?
                .parse()
                .map_err(|_| LedgerError::Parse("invalid price".to_string()))?,
        };
        record.validate()?;
        Ok(record)
    }
}

/// Whether `record_trade` actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeIdInsertOutcome {
    Inserted,
    Duplicate,
}

struct RegistryState {
    file: File,
    records: HashMap<String, TradeIdRecord>,
}

/// Durable, write-once trade-id set with an in-memory index.
pub struct TradeIdRegistry {
    path: PathBuf,
    state: Mutex<RegistryState>,
    duplicates: AtomicU64,
}

impl TradeIdRegistry {
    /// Open (creating if needed) and rebuild the index from the file.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        let records = load_records(&path)?;
        let file = OpenOptions::new().append(true).open(&path)?;

        Ok(Self {
            path,
            state: Mutex::new(RegistryState { file, records }),
            duplicates: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn duplicates_total(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn contains(&self, trade_id: &str) -> bool {
        self.state.lock().records.contains_key(trade_id)
    }

    pub fn record_for(&self, trade_id: &str) -> Option<TradeIdRecord> {
        self.state.lock().records.get(trade_id).cloned()
    }

    /// Append-before-apply: the line is written and synced before the
    /// in-memory index changes. A duplicate is a counted no-op.
    pub fn record_trade(&self, record: TradeIdRecord) -> LedgerResult<TradeIdInsertOutcome> {
        record.validate()?;

        let mut state = self.state.lock();
        if state.records.contains_key(&record.trade_id) {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            return Ok(TradeIdInsertOutcome::Duplicate);
        }

        let line = record.to_line();
        state.file.write_all(line.as_bytes())?;
        state.file.write_all(b"\n")?;
        state.file.sync_data()?;

        state.records.insert(record.trade_id.clone(), record);
        Ok(TradeIdInsertOutcome::Inserted)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_records(path: &Path) -> LedgerResult<HashMap<String, TradeIdRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = TradeIdRecord::from_line(&line)
            .map_err(|err| LedgerError::Parse(format!("line {}: {err}", idx + 1)))?;
        records.insert(record.trade_id.clone(), record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("ordx-trades-{}.log", uuid::Uuid::new_v4()))
    }

    fn record(trade_id: &str) -> TradeIdRecord {
        TradeIdRecord {
            trade_id: trade_id.to_string(),
            group_id: "grp-1".to_string(),
            leg_idx: 0,
            ts_ms: 1_000,
            qty: Qty::new(dec!(0.01)),
            price: Price::new(dec!(100.0)),
        }
    }

    #[test]
    fn test_insert_then_duplicate() {
        let path = temp_path();
        let registry = TradeIdRegistry::open(&path).unwrap();

        assert_eq!(
            registry.record_trade(record("t-1")).unwrap(),
            TradeIdInsertOutcome::Inserted
        );
        assert_eq!(
            registry.record_trade(record("t-1")).unwrap(),
            TradeIdInsertOutcome::Duplicate
        );
        assert_eq!(registry.duplicates_total(), 1);
        assert!(registry.contains("t-1"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_reopen_rebuilds_index() {
        let path = temp_path();
        {
            let registry = TradeIdRegistry::open(&path).unwrap();
            registry.record_trade(record("t-1")).unwrap();
            registry.record_trade(record("t-2")).unwrap();
        }

        let registry = TradeIdRegistry::open(&path).unwrap();
        assert!(registry.contains("t-1"));
        assert!(registry.contains("t-2"));
        assert_eq!(
            registry.record_trade(record("t-2")).unwrap(),
            TradeIdInsertOutcome::Duplicate
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_record_never_written() {
        let path = temp_path();
        let registry = TradeIdRegistry::open(&path).unwrap();
        let mut bad = record("t-1");
        bad.qty = Qty::ZERO;
        assert!(registry.record_trade(bad).is_err());
        assert!(!registry.contains("t-1"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ids_with_delimiters() {
        let path = temp_path();
        {
            let registry = TradeIdRegistry::open(&path).unwrap();
            registry.record_trade(record("t|1=2%3")).unwrap();
        }
        let registry = TradeIdRegistry::open(&path).unwrap();
        assert!(registry.contains("t|1=2%3"));
        std::fs::remove_file(&path).ok();
    }
}
