//! Startup reconciliation.
//!
//! Replay can leave records with no sent timestamp: the process died between
//! recording and dispatch, or between dispatch and the sent append. Each one
//! is matched against the venue's open orders. Proven at the venue means the
//! dispatch happened and the ledger catches up; proven absent means it is
//! safe to hand back for a fresh dispatch; anything in between stays blocked
//! until an operator resolves it.

use ordx_core::LifecycleState;
use ordx_ledger::{IntentWal, ReplaySummary, WalRecord};
use tracing::{info, warn};

use crate::error::ExecutorResult;
use crate::label::decode_label;
use crate::label_match::{match_order, ExpectedOrder, MatchOutcome, VenueOrder};

/// Supplier of the venue's current open orders. The transport behind it is
/// not this crate's concern.
pub trait VenueOrders {
    fn open_orders(&self) -> Vec<VenueOrder>;
}

impl VenueOrders for Vec<VenueOrder> {
    fn open_orders(&self) -> Vec<VenueOrder> {
        self.clone()
    }
}

/// What reconciliation decided for one pending record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// The order exists at the venue; the ledger now carries the sent state.
    MarkedSent { intent_hash: u64, order_id: String },
    /// Nothing at the venue matches; the intent may be dispatched again.
    Released { intent_hash: u64 },
    /// Matching could not decide. The caller must latch the open-block and
    /// leave the intent in flight.
    Ambiguous {
        intent_hash: u64,
        candidates: Vec<String>,
    },
}

impl ReconcileAction {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ReconcileAction::Ambiguous { .. })
    }
}

/// Reconcile every pending dispatch in the replay against the venue's open
/// orders, appending catch-up records for the ones the venue confirms.
pub fn reconcile<V: VenueOrders>(
    summary: &ReplaySummary,
    venue: &V,
    wal: &IntentWal,
    now_ms: u64,
) -> ExecutorResult<Vec<ReconcileAction>> {
    let venue_orders = venue.open_orders();
    let mut actions = Vec::new();

    for record in summary.pending_dispatches() {
        let expected = match expected_from_record(record) {
            Some(expected) => expected,
            None => {
                // A ledger record whose own label will not decode cannot be
                // matched, and absence cannot be proven either.
                warn!(
                    intent_hash = format_args!("{:016x}", record.intent_hash),
                    label = %record.label,
                    "undecodable label in pending record"
                );
                actions.push(ReconcileAction::Ambiguous {
                    intent_hash: record.intent_hash,
                    candidates: Vec::new(),
                });
                continue;
            }
        };

        match match_order(&expected, &venue_orders) {
            MatchOutcome::Matched { order_id } => {
                let mut sent = record.clone();
                sent.state = LifecycleState::Sent;
                sent.sent_ts_ms = Some(now_ms);
                wal.append(sent)?;
                info!(
                    intent_hash = format_args!("{:016x}", record.intent_hash),
                    order_id = %order_id,
                    "pending dispatch confirmed at venue"
                );
                actions.push(ReconcileAction::MarkedSent {
                    intent_hash: record.intent_hash,
                    order_id,
                });
            }
            MatchOutcome::NoMatch => {
                info!(
                    intent_hash = format_args!("{:016x}", record.intent_hash),
                    "pending dispatch absent at venue; released"
                );
                actions.push(ReconcileAction::Released {
                    intent_hash: record.intent_hash,
                });
            }
            MatchOutcome::Ambiguous { candidates } => {
                actions.push(ReconcileAction::Ambiguous {
                    intent_hash: record.intent_hash,
                    candidates,
                });
            }
        }
    }

    Ok(actions)
}

fn expected_from_record(record: &WalRecord) -> Option<ExpectedOrder> {
    let parts = decode_label(&record.label).ok()?;
    Some(ExpectedOrder {
        label_parts: parts,
        instrument_id: record.instrument_id.clone(),
        side: record.side,
        qty_q: record.qty_q,
    })
}
