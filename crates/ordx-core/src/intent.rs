//! Order intents, before and after quantization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Qty};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

/// Requested order type. Only resting or IOC limits survive preflight;
/// the rest exist so the guard can name what it refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    StopLimit,
    StopMarket,
}

impl OrderType {
    #[must_use]
    pub fn is_stop(self) -> bool {
        matches!(self, OrderType::StopLimit | OrderType::StopMarket)
    }
}

/// Time in force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    GoodTilCancelled,
    ImmediateOrCancel,
}

/// Linked order relationship requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedOrderType {
    OneCancelsOther,
    OneTriggersOther,
}

/// Action requested upstream, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    Place,
    Close,
    Hedge,
    Cancel,
    Unknown,
}

/// What the intent does to risk. Drives gate exemptions and dispatch
/// authorization, so misclassification must land on the strict side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentClass {
    Open,
    Close,
    Hedge,
    Cancel,
}

impl IntentClass {
    /// Classify from the upstream action and the venue reduce-only flag.
    ///
    /// Unknown actions fail closed: without the reduce-only flag they are
    /// treated as `Open` and get the full gate sequence.
    #[must_use]
    pub fn classify(action: IntentAction, reduce_only: bool) -> Self {
        match action {
            IntentAction::Cancel => IntentClass::Cancel,
            IntentAction::Close => IntentClass::Close,
            IntentAction::Hedge => IntentClass::Hedge,
            IntentAction::Place | IntentAction::Unknown => {
                if reduce_only {
                    IntentClass::Close
                } else {
                    IntentClass::Open
                }
            }
        }
    }

    /// Only `Open` increases risk; everything else reduces or removes it.
    #[must_use]
    pub fn is_risk_increasing(self) -> bool {
        matches!(self, IntentClass::Open)
    }
}

impl fmt::Display for IntentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentClass::Open => "open",
            IntentClass::Close => "close",
            IntentClass::Hedge => "hedge",
            IntentClass::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// An intent as submitted by strategy code, before quantization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIntent {
    pub instrument_id: String,
    pub side: OrderSide,
    pub class: IntentClass,
    pub raw_qty: Qty,
    pub raw_limit_price: Price,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub linked: Option<LinkedOrderType>,
    /// Strategy group this intent belongs to.
    pub group_id: String,
    /// Leg index within the group.
    pub leg_idx: u32,
}

/// Result of quantization: venue-legal values plus the integer step counts
/// that feed the idempotency hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedIntent {
    pub qty_q: Qty,
    pub limit_price_q: Price,
    pub qty_steps: u64,
    pub price_ticks: u64,
}

impl QuantizedIntent {
    /// Notional of the quantized order.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.qty_q.notional(self.limit_price_q)
    }
}
