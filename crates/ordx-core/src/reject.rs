//! Typed rejection taxonomy.
//!
//! Every refusal to act is one of these variants. String-typed reasons are
//! not allowed past module boundaries: metrics, logs, and the intent ledger
//! all key off the stable label of the variant.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::risk::RiskSignal;

/// Why an intent was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Instrument metadata absent, expired, or failed validation.
    InstrumentMetadataMissing,
    /// Raw quantity or price was non-positive or otherwise unusable.
    InvalidInput(String),
    /// Quantity fell below the venue minimum after lot rounding.
    TooSmallAfterQuantization,
    /// Encoded label would exceed the venue's 64-char bound.
    LabelTooLong,
    /// Reconnect label match narrowed to more than one candidate.
    LabelMatchAmbiguous,
    /// Walking the book produced slippage above the configured bound.
    ExpectedSlippageTooHigh,
    /// Order book snapshot missing, stale, or structurally invalid.
    LiquidityGateNoL2,
    /// Expected net edge below the configured minimum.
    NetEdgeTooLow,
    /// A net-edge input was absent; the gate cannot run.
    NetEdgeInputMissing,
    /// Venue contract count disagrees with the quantized amount.
    ContractsAmountMismatch,
    /// Market orders are forbidden at this chokepoint.
    OrderTypeMarketForbidden,
    /// Stop/trigger orders are forbidden at this chokepoint.
    OrderTypeStopForbidden,
    /// Linked (OCO/OTO) orders forbidden without capability and flag.
    LinkedOrderTypeForbidden,
    /// Post-only limit would cross the touch and take liquidity.
    PostOnlyWouldCross,
    /// Dispatch authorization refused an Open under a degraded signal.
    DispatchBlocked(RiskSignal),
    /// The ledger queue was full; nothing may dispatch unrecorded.
    WalEnqueueFailed,
}

impl RejectReason {
    /// Stable label for metrics and ledger records.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::InstrumentMetadataMissing => "instrument_metadata_missing",
            Self::InvalidInput(_) => "invalid_input",
            Self::TooSmallAfterQuantization => "too_small_after_quantization",
            Self::LabelTooLong => "label_too_long",
            Self::LabelMatchAmbiguous => "label_match_ambiguous",
            Self::ExpectedSlippageTooHigh => "expected_slippage_too_high",
            Self::LiquidityGateNoL2 => "liquidity_gate_no_l2",
            Self::NetEdgeTooLow => "net_edge_too_low",
            Self::NetEdgeInputMissing => "net_edge_input_missing",
            Self::ContractsAmountMismatch => "contracts_amount_mismatch",
            Self::OrderTypeMarketForbidden => "order_type_market_forbidden",
            Self::OrderTypeStopForbidden => "order_type_stop_forbidden",
            Self::LinkedOrderTypeForbidden => "linked_order_type_forbidden",
            Self::PostOnlyWouldCross => "post_only_would_cross",
            Self::DispatchBlocked(_) => "dispatch_blocked",
            Self::WalEnqueueFailed => "wal_enqueue_failed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(detail) => write!(f, "invalid_input: {detail}"),
            Self::DispatchBlocked(signal) => write!(f, "dispatch_blocked: {signal}"),
            other => f.write_str(other.as_label()),
        }
    }
}
