//! L2 order book snapshot used by the liquidity gate.

use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Qty};
use crate::intent::OrderSide;

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2Level {
    pub price: Price,
    pub qty: Qty,
}

/// A point-in-time snapshot of the top of book.
///
/// Bids descending, asks ascending. `validate` enforces that; the gate
/// never trusts upstream ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Snapshot {
    pub instrument_id: String,
    pub bids: Vec<L2Level>,
    pub asks: Vec<L2Level>,
    pub ts_ms: u64,
}

impl L2Snapshot {
    #[must_use]
    pub fn best_bid(&self) -> Option<L2Level> {
        self.bids.first().copied()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<L2Level> {
        self.asks.first().copied()
    }

    /// Levels an aggressor on `side` would consume.
    #[must_use]
    pub fn levels_for(&self, side: OrderSide) -> &[L2Level] {
        match side {
            OrderSide::Buy => &self.asks,
            OrderSide::Sell => &self.bids,
        }
    }

    /// A snapshot from the future (clock skew) is not fresh.
    #[must_use]
    pub fn is_fresh(&self, now_ms: u64, max_age_ms: u64) -> bool {
        match now_ms.checked_sub(self.ts_ms) {
            Some(age) => age <= max_age_ms,
            None => false,
        }
    }

    /// Structural validation: non-empty relevant side, positive prices and
    /// quantities, correct ordering, no crossed book.
    #[must_use]
    pub fn is_valid_for(&self, side: OrderSide) -> bool {
        let levels = self.levels_for(side);
        if levels.is_empty() {
            return false;
        }
        if levels
            .iter()
            .any(|l| !l.price.is_positive() || !l.qty.is_positive())
        {
            return false;
        }
        let ordered = match side {
            OrderSide::Buy => levels.windows(2).all(|w| w[0].price <= w[1].price),
            OrderSide::Sell => levels.windows(2).all(|w| w[0].price >= w[1].price),
        };
        if !ordered {
            return false;
        }
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid.price >= ask.price {
                return false;
            }
        }
        true
    }
}
