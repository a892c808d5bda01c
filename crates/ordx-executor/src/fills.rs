//! Fill handling: trade-id dedup ahead of any lifecycle update.
//!
//! Venues redeliver fills freely across reconnects. The trade id is
//! appended to the durable registry before the lifecycle state machine sees
//! the event, so a replayed fill collapses to a counted no-op instead of a
//! double-applied quantity.

use ordx_core::{LifecycleState, Price, Qty};
use ordx_ledger::{TradeIdInsertOutcome, TradeIdRecord, TradeIdRegistry};
use tracing::debug;

use crate::error::ExecutorResult;
use crate::tlsm::{LifecycleEvent, TrackedIntent, TransitionLedger};

/// One execution report from the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub trade_id: String,
    pub ts_ms: u64,
    pub qty: Qty,
    pub price: Price,
    /// The venue reports the order as fully filled by this trade.
    pub fully_filled: bool,
}

/// What a fill did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Applied(LifecycleState),
    Duplicate,
}

/// Apply one fill to a tracked order, registry first.
pub fn apply_fill<L: TransitionLedger>(
    registry: &TradeIdRegistry,
    tracked: &mut TrackedIntent,
    event: &FillEvent,
    ledger: &L,
) -> ExecutorResult<FillOutcome> {
    let record = TradeIdRecord {
        trade_id: event.trade_id.clone(),
        group_id: tracked.record().group_id.clone(),
        leg_idx: tracked.record().leg_idx,
        ts_ms: event.ts_ms,
        qty: event.qty,
        price: event.price,
    };

    if registry.record_trade(record)? == TradeIdInsertOutcome::Duplicate {
        ordx_telemetry::metrics::TRADE_ID_DUPLICATES_TOTAL.inc();
        debug!(
            trade_id = %event.trade_id,
            intent_hash = format_args!("{:016x}", tracked.record().intent_hash),
            "duplicate fill suppressed"
        );
        return Ok(FillOutcome::Duplicate);
    }

    let lifecycle_event = if event.fully_filled {
        LifecycleEvent::Fill { ts_ms: event.ts_ms }
    } else {
        LifecycleEvent::PartialFill { ts_ms: event.ts_ms }
    };
    let state = tracked.apply(lifecycle_event, ledger)?;
    Ok(FillOutcome::Applied(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordx_core::{IntentClass, OrderSide};
    use ordx_ledger::{LedgerResult, WalRecord};
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct CapturingLedger {
        records: RefCell<Vec<WalRecord>>,
    }

    impl TransitionLedger for CapturingLedger {
        fn record_transition(&self, record: &WalRecord) -> LedgerResult<()> {
            self.records.borrow_mut().push(record.clone());
            Ok(())
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("ordx-fills-{}.log", uuid::Uuid::new_v4()))
    }

    fn tracked() -> TrackedIntent {
        TrackedIntent::new(WalRecord {
            intent_hash: 1,
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            class: IntentClass::Open,
            qty_q: Qty::new(dec!(0.02)),
            limit_price_q: Price::new(dec!(100.0)),
            qty_steps: 2,
            price_ticks: 200,
            group_id: "grp-1".to_string(),
            leg_idx: 0,
            label: "s4:stratalp:grp1:0:0000000000000001".to_string(),
            state: LifecycleState::Acked,
            created_ts_ms: 1_000,
            sent_ts_ms: Some(1_100),
        })
    }

    fn fill(trade_id: &str, fully_filled: bool) -> FillEvent {
        FillEvent {
            trade_id: trade_id.to_string(),
            ts_ms: 1_300,
            qty: Qty::new(dec!(0.01)),
            price: Price::new(dec!(100.0)),
            fully_filled,
        }
    }

    #[test]
    fn test_partial_then_full_fill() {
        let path = temp_path();
        let registry = TradeIdRegistry::open(&path).unwrap();
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        let outcome = apply_fill(&registry, &mut t, &fill("t-1", false), &ledger).unwrap();
        assert_eq!(outcome, FillOutcome::Applied(LifecycleState::PartiallyFilled));

        let outcome = apply_fill(&registry, &mut t, &fill("t-2", true), &ledger).unwrap();
        assert_eq!(outcome, FillOutcome::Applied(LifecycleState::Filled));
        assert_eq!(ledger.records.borrow().len(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_redelivered_fill_is_a_noop() {
        let path = temp_path();
        let registry = TradeIdRegistry::open(&path).unwrap();
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        apply_fill(&registry, &mut t, &fill("t-1", false), &ledger).unwrap();
        let writes_before = ledger.records.borrow().len();

        let outcome = apply_fill(&registry, &mut t, &fill("t-1", false), &ledger).unwrap();
        assert_eq!(outcome, FillOutcome::Duplicate);
        assert_eq!(t.state(), LifecycleState::PartiallyFilled);
        assert_eq!(ledger.records.borrow().len(), writes_before);
        assert_eq!(registry.duplicates_total(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_duplicate_survives_registry_reopen() {
        let path = temp_path();
        let ledger = CapturingLedger::default();
        let mut t = tracked();
        {
            let registry = TradeIdRegistry::open(&path).unwrap();
            apply_fill(&registry, &mut t, &fill("t-1", true), &ledger).unwrap();
        }

        // New process life, same registry file: the redelivery still no-ops.
        let registry = TradeIdRegistry::open(&path).unwrap();
        let outcome = apply_fill(&registry, &mut t, &fill("t-1", true), &ledger).unwrap();
        assert_eq!(outcome, FillOutcome::Duplicate);
        std::fs::remove_file(&path).ok();
    }
}
