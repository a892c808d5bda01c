//! Trade lifecycle state machine.
//!
//! The transition function is total: every (state, event) pair has a
//! defined successor. Venue event streams reorder and replay, so surprises
//! are counted, never errored. Two rules anchor everything:
//! terminal states absorb, and a fill always wins (a fill observed after a
//! cancel confirmation means the fill was real and the cancel lost the race).
//!
//! Every state change is appended to the intent ledger before the
//! in-memory state is considered current.

use ordx_core::LifecycleState;
use ordx_ledger::{IntentWal, LedgerResult, WalRecord};
use tracing::debug;

/// A lifecycle observation from the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Sent { ts_ms: u64 },
    Acked { ts_ms: u64 },
    PartialFill { ts_ms: u64 },
    Fill { ts_ms: u64 },
    CancelConfirmed { ts_ms: u64 },
    Failure { ts_ms: u64 },
}

/// Sink for lifecycle transitions. The WAL is the production
/// implementation; tests substitute their own.
pub trait TransitionLedger {
    fn record_transition(&self, record: &WalRecord) -> LedgerResult<()>;
}

impl TransitionLedger for IntentWal {
    fn record_transition(&self, record: &WalRecord) -> LedgerResult<()> {
        self.append(record.clone())
    }
}

/// One order's lifecycle, tracked against its ledger record.
#[derive(Debug, Clone)]
pub struct TrackedIntent {
    record: WalRecord,
    ack_ts_ms: Option<u64>,
    last_fill_ts_ms: Option<u64>,
    out_of_order_total: u64,
}

impl TrackedIntent {
    pub fn new(record: WalRecord) -> Self {
        Self {
            record,
            ack_ts_ms: None,
            last_fill_ts_ms: None,
            out_of_order_total: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.record.state
    }

    #[must_use]
    pub fn record(&self) -> &WalRecord {
        &self.record
    }

    #[must_use]
    pub fn sent_ts_ms(&self) -> Option<u64> {
        self.record.sent_ts_ms
    }

    #[must_use]
    pub fn ack_ts_ms(&self) -> Option<u64> {
        self.ack_ts_ms
    }

    #[must_use]
    pub fn last_fill_ts_ms(&self) -> Option<u64> {
        self.last_fill_ts_ms
    }

    #[must_use]
    pub fn out_of_order_total(&self) -> u64 {
        self.out_of_order_total
    }

    /// Apply one event. Returns the (possibly unchanged) state.
    pub fn apply<L: TransitionLedger>(
        &mut self,
        event: LifecycleEvent,
        ledger: &L,
    ) -> LedgerResult<LifecycleState> {
        let current = self.record.state;
        let next = transition(current, event);

        if is_out_of_order(current, event) {
            self.out_of_order_total += 1;
            ordx_telemetry::metrics::TLSM_OUT_OF_ORDER_TOTAL.inc();
            debug!(
                intent_hash = format_args!("{:016x}", self.record.intent_hash),
                state = %current,
                ?event,
                "out-of-order lifecycle event"
            );
        }

        // Timestamps: sent and ack are set-once, fill advances monotonically.
        match event {
            LifecycleEvent::Sent { ts_ms } => {
                if self.record.sent_ts_ms.is_none() {
                    self.record.sent_ts_ms = Some(ts_ms);
                }
            }
            LifecycleEvent::Acked { ts_ms } => {
                if self.ack_ts_ms.is_none() {
                    self.ack_ts_ms = Some(ts_ms);
                }
            }
            LifecycleEvent::PartialFill { ts_ms } | LifecycleEvent::Fill { ts_ms } => {
                self.last_fill_ts_ms = Some(self.last_fill_ts_ms.map_or(ts_ms, |t| t.max(ts_ms)));
            }
            LifecycleEvent::CancelConfirmed { .. } | LifecycleEvent::Failure { .. } => {}
        }

        if next != current {
            self.record.state = next;
            ledger.record_transition(&self.record)?;
        }
        Ok(next)
    }
}

/// The total transition function.
fn transition(state: LifecycleState, event: LifecycleEvent) -> LifecycleState {
    use LifecycleEvent as E;
    use LifecycleState as S;

    // A fill always wins, terminal or not.
    if matches!(event, E::Fill { .. }) {
        return S::Filled;
    }
    // Otherwise terminal states absorb.
    if state.is_terminal() {
        return state;
    }

    match event {
        E::Sent { .. } => match state {
            S::Created => S::Sent,
            other => other,
        },
        E::Acked { .. } => match state {
            S::Created | S::Sent => S::Acked,
            other => other,
        },
        E::PartialFill { .. } => S::PartiallyFilled,
        E::CancelConfirmed { .. } => S::Canceled,
        E::Failure { .. } => S::Failed,
        E::Fill { .. } => S::Filled,
    }
}

/// Whether the event arrived outside the expected order. Observational
/// only; the transition already happened.
fn is_out_of_order(state: LifecycleState, event: LifecycleEvent) -> bool {
    use LifecycleEvent as E;
    use LifecycleState as S;

    match event {
        E::Fill { .. } => matches!(state, S::Created | S::Canceled | S::Failed | S::Filled),
        E::PartialFill { .. } => matches!(state, S::Created) || state.is_terminal(),
        E::Acked { .. } => !matches!(state, S::Sent),
        E::Sent { .. } => !matches!(state, S::Created),
        E::CancelConfirmed { .. } | E::Failure { .. } => state.is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordx_core::{IntentClass, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    /// Test ledger capturing every transition record.
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

    fn tracked() -> TrackedIntent {
        TrackedIntent::new(WalRecord {
            intent_hash: 1,
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            class: IntentClass::Open,
            qty_q: Qty::new(dec!(0.01)),
            limit_price_q: Price::new(dec!(100.0)),
            qty_steps: 1,
            price_ticks: 200,
            group_id: "grp-1".to_string(),
            leg_idx: 0,
            label: "s4:stratalp:grp1:0:0000000000000001".to_string(),
            state: LifecycleState::Created,
            created_ts_ms: 1_000,
            sent_ts_ms: None,
        })
    }

    #[test]
    fn test_happy_path() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        t.apply(LifecycleEvent::Sent { ts_ms: 1_100 }, &ledger).unwrap();
        t.apply(LifecycleEvent::Acked { ts_ms: 1_200 }, &ledger).unwrap();
        t.apply(LifecycleEvent::PartialFill { ts_ms: 1_300 }, &ledger)
            .unwrap();
        let state = t.apply(LifecycleEvent::Fill { ts_ms: 1_400 }, &ledger).unwrap();

        assert_eq!(state, LifecycleState::Filled);
        assert_eq!(t.sent_ts_ms(), Some(1_100));
        assert_eq!(t.ack_ts_ms(), Some(1_200));
        assert_eq!(t.last_fill_ts_ms(), Some(1_400));
        assert_eq!(t.out_of_order_total(), 0);

        let states: Vec<LifecycleState> =
            ledger.records.borrow().iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::Sent,
                LifecycleState::Acked,
                LifecycleState::PartiallyFilled,
                LifecycleState::Filled
            ]
        );
    }

    #[test]
    fn test_fill_before_ack_converges_to_filled() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        t.apply(LifecycleEvent::Sent { ts_ms: 1_100 }, &ledger).unwrap();
        let state = t.apply(LifecycleEvent::Fill { ts_ms: 1_150 }, &ledger).unwrap();
        assert_eq!(state, LifecycleState::Filled);

        // Late ack absorbs; no state change, no extra ledger write.
        let before = ledger.records.borrow().len();
        let state = t.apply(LifecycleEvent::Acked { ts_ms: 1_200 }, &ledger).unwrap();
        assert_eq!(state, LifecycleState::Filled);
        assert_eq!(ledger.records.borrow().len(), before);
        assert_eq!(t.out_of_order_total(), 1);
        // Ack timestamp is still captured.
        assert_eq!(t.ack_ts_ms(), Some(1_200));
    }

    #[test]
    fn test_fill_wins_over_cancel() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        t.apply(LifecycleEvent::Sent { ts_ms: 1_100 }, &ledger).unwrap();
        t.apply(LifecycleEvent::CancelConfirmed { ts_ms: 1_200 }, &ledger)
            .unwrap();
        assert_eq!(t.state(), LifecycleState::Canceled);

        let state = t.apply(LifecycleEvent::Fill { ts_ms: 1_150 }, &ledger).unwrap();
        assert_eq!(state, LifecycleState::Filled);
        assert_eq!(t.out_of_order_total(), 1);
    }

    #[test]
    fn test_terminal_absorbs_everything_else() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();
        t.apply(LifecycleEvent::Failure { ts_ms: 1_100 }, &ledger).unwrap();

        for event in [
            LifecycleEvent::Sent { ts_ms: 1_200 },
            LifecycleEvent::Acked { ts_ms: 1_300 },
            LifecycleEvent::PartialFill { ts_ms: 1_400 },
            LifecycleEvent::CancelConfirmed { ts_ms: 1_500 },
            LifecycleEvent::Failure { ts_ms: 1_600 },
        ] {
            assert_eq!(t.apply(event, &ledger).unwrap(), LifecycleState::Failed);
        }
        assert_eq!(t.out_of_order_total(), 5);
    }

    #[test]
    fn test_set_once_timestamps() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();

        t.apply(LifecycleEvent::Sent { ts_ms: 1_100 }, &ledger).unwrap();
        t.apply(LifecycleEvent::Sent { ts_ms: 2_000 }, &ledger).unwrap();
        assert_eq!(t.sent_ts_ms(), Some(1_100));

        t.apply(LifecycleEvent::PartialFill { ts_ms: 1_500 }, &ledger)
            .unwrap();
        t.apply(LifecycleEvent::PartialFill { ts_ms: 1_300 }, &ledger)
            .unwrap();
        // Fill timestamp only moves forward.
        assert_eq!(t.last_fill_ts_ms(), Some(1_500));
    }

    #[test]
    fn test_duplicate_partial_fill_writes_once() {
        let ledger = CapturingLedger::default();
        let mut t = tracked();
        t.apply(LifecycleEvent::Sent { ts_ms: 1_100 }, &ledger).unwrap();
        t.apply(LifecycleEvent::PartialFill { ts_ms: 1_200 }, &ledger)
            .unwrap();
        let before = ledger.records.borrow().len();
        t.apply(LifecycleEvent::PartialFill { ts_ms: 1_250 }, &ledger)
            .unwrap();
        // Same state, no new ledger record.
        assert_eq!(ledger.records.borrow().len(), before);
    }
}
