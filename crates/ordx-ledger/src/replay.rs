//! Startup replay of the intent WAL.
//!
//! The log is append-only: the truth about an intent is its most recent
//! record. Replay folds the log down to the latest record per intent hash,
//! preserving recency order, and extracts what still needs attention.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::error::LedgerResult;
use crate::record::WalRecord;

/// Outcome of folding the log.
#[derive(Debug, Default)]
pub struct ReplaySummary {
    /// Latest record per intent hash, ordered by last appearance in the log.
    pub latest: Vec<WalRecord>,
    /// Lines that failed to parse. A crash can truncate the final line;
    /// anything beyond one bad tail line deserves investigation.
    pub skipped_lines: u64,
}

impl ReplaySummary {
    /// Records that were written but never confirmed sent, including local
    /// dispatch failures whose venue-side outcome is unknown. These are the
    /// candidates for reconciliation; none may be redispatched blindly.
    #[must_use]
    pub fn pending_dispatches(&self) -> Vec<&WalRecord> {
        self.latest
            .iter()
            .filter(|r| r.needs_reconciliation())
            .collect()
    }
}

/// Read the log and fold to the latest record per intent hash.
///
/// An empty or absent file is an empty summary, not an error.
pub fn replay_latest(path: &Path) -> LedgerResult<ReplaySummary> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ReplaySummary::default());
        }
        Err(err) => return Err(err.into()),
    };

    let reader = BufReader::new(file);
    let mut order: Vec<u64> = Vec::new();
    let mut latest: HashMap<u64, WalRecord> = HashMap::new();
    let mut skipped = 0u64;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = match WalRecord::from_line(&line) {
            Ok(r) => r,
            Err(err) => {
                warn!(line_no = idx + 1, %err, "skipping unparseable WAL line");
                skipped += 1;
                continue;
            }
        };
        if latest.insert(record.intent_hash, record.clone()).is_some() {
            // Move to the back: recency order, not first-seen order.
            order.retain(|h| *h != record.intent_hash);
        }
        order.push(record.intent_hash);
    }

    let latest = order
        .into_iter()
        .filter_map(|h| latest.remove(&h))
        .collect();

    Ok(ReplaySummary {
        latest,
        skipped_lines: skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WalRecord;
    use ordx_core::{IntentClass, LifecycleState, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("ordx-replay-{}.log", uuid::Uuid::new_v4()))
    }

    fn record(hash: u64, state: LifecycleState, sent_ts_ms: Option<u64>) -> WalRecord {
        WalRecord {
            intent_hash: hash,
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            class: IntentClass::Open,
            qty_q: Qty::new(dec!(0.01)),
            limit_price_q: Price::new(dec!(100.0)),
            qty_steps: 1,
            price_ticks: 200,
            group_id: "grp-1".to_string(),
            leg_idx: 0,
            label: "s4:abcd1234:grp1:0:0000000000000001".to_string(),
            state,
            created_ts_ms: 1_000,
            sent_ts_ms,
        }
    }

    fn write_lines(path: &Path, records: &[WalRecord]) {
        let mut f = File::create(path).unwrap();
        for r in records {
            writeln!(f, "{}", r.to_line()).unwrap();
        }
    }

    #[test]
    fn test_latest_wins_in_recency_order() {
        let path = temp_path();
        write_lines(
            &path,
            &[
                record(1, LifecycleState::Created, None),
                record(2, LifecycleState::Created, None),
                record(1, LifecycleState::Sent, Some(2_000)),
            ],
        );

        let summary = replay_latest(&path).unwrap();
        assert_eq!(summary.latest.len(), 2);
        // Hash 1 was touched last, so it comes last.
        assert_eq!(summary.latest[0].intent_hash, 2);
        assert_eq!(summary.latest[1].intent_hash, 1);
        assert_eq!(summary.latest[1].state, LifecycleState::Sent);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_pending_excludes_sent_and_settled_terminals() {
        let path = temp_path();
        write_lines(
            &path,
            &[
                record(1, LifecycleState::Created, None),
                record(2, LifecycleState::Sent, Some(2_000)),
                record(3, LifecycleState::Sent, Some(2_000)),
                record(3, LifecycleState::Filled, Some(2_000)),
            ],
        );

        let summary = replay_latest(&path).unwrap();
        let pending = summary.pending_dispatches();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].intent_hash, 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_pending_keeps_unsent_local_failures() {
        // A Failed record with no sent timestamp means the venue call
        // errored locally; the venue may still hold the order, so it has to
        // go through reconciliation rather than vanish from pending.
        let path = temp_path();
        write_lines(
            &path,
            &[
                record(7, LifecycleState::Created, None),
                record(7, LifecycleState::Failed, None),
            ],
        );

        let summary = replay_latest(&path).unwrap();
        let pending = summary.pending_dispatches();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].intent_hash, 7);
        assert_eq!(pending[0].state, LifecycleState::Failed);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncated_tail_line_skipped() {
        let path = temp_path();
        write_lines(&path, &[record(1, LifecycleState::Created, None)]);
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            // Simulate a crash mid-write.
            write!(f, "v=1|intent_hash=00000000000000").unwrap();
        }

        let summary = replay_latest(&path).unwrap();
        assert_eq!(summary.latest.len(), 1);
        assert_eq!(summary.skipped_lines, 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_empty() {
        let summary = replay_latest(Path::new("/nonexistent/ordx.wal")).unwrap();
        assert!(summary.latest.is_empty());
    }
}
