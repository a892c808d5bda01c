//! Liquidity gate: snapshot freshness and expected slippage.
//!
//! Ordering matters in the pipeline: this gate runs after quantization, so
//! it walks the book with the exact quantity that would be sent.

use ordx_core::{IntentClass, L2Snapshot, OrderSide, Price, Qty, RejectReason};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::GateConfig;

/// Source of a reference price when the strategy supplies none of its own.
pub trait FairPriceSource {
    fn fair_price(&self) -> Option<Price>;
}

/// Mid-price fallback taken from the snapshot itself. Requires an uncrossed
/// two-sided book; a one-sided book yields nothing rather than a bad anchor.
impl FairPriceSource for L2Snapshot {
    fn fair_price(&self) -> Option<Price> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        if bid >= ask {
            return None;
        }
        Some(Price::new((bid.inner() + ask.inner()) / Decimal::TWO))
    }
}

/// What the liquidity gate learned. `wap` and `slippage_bps` are only
/// populated for Open intents; risk-reducing intents are not slippage-gated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityVerdict {
    pub wap: Option<Price>,
    pub slippage_bps: Option<Decimal>,
}

impl LiquidityVerdict {
    const PASS_UNGATED: Self = Self {
        wap: None,
        slippage_bps: None,
    };
}

/// Evaluate liquidity for a quantized intent.
///
/// Cancel intents are exempt entirely. Every other class requires a fresh,
/// structurally valid snapshot; only Open is additionally slippage-gated.
pub fn liquidity_gate(
    class: IntentClass,
    side: OrderSide,
    qty_q: Qty,
    book: Option<&L2Snapshot>,
    now_ms: u64,
    config: &GateConfig,
) -> Result<LiquidityVerdict, RejectReason> {
    if class == IntentClass::Cancel {
        return Ok(LiquidityVerdict::PASS_UNGATED);
    }

    let Some(book) = book else {
        return Err(RejectReason::LiquidityGateNoL2);
    };
    if !book.is_fresh(now_ms, config.l2_snapshot_max_age_ms) {
        debug!(
            instrument_id = %book.instrument_id,
            ts_ms = book.ts_ms,
            now_ms,
            "stale L2 snapshot"
        );
        return Err(RejectReason::LiquidityGateNoL2);
    }
    if !book.is_valid_for(side) {
        return Err(RejectReason::LiquidityGateNoL2);
    }

    if class != IntentClass::Open {
        return Ok(LiquidityVerdict::PASS_UNGATED);
    }

    let levels = book.levels_for(side);
    // Relevant side is non-empty after is_valid_for.
    let best = levels[0].price;

    let Some(wap) = walk_book(levels, qty_q) else {
        // Not enough depth to absorb the order: no usable liquidity.
        return Err(RejectReason::LiquidityGateNoL2);
    };

    let slippage_bps = match wap.bps_from(best) {
        Some(bps) => bps.abs(),
        None => return Err(RejectReason::LiquidityGateNoL2),
    };

    if slippage_bps > config.max_slippage_bps {
        debug!(
            instrument_id = %book.instrument_id,
            %slippage_bps,
            max = %config.max_slippage_bps,
            "expected slippage above bound"
        );
        return Err(RejectReason::ExpectedSlippageTooHigh);
    }

    Ok(LiquidityVerdict {
        wap: Some(wap),
        slippage_bps: Some(slippage_bps),
    })
}

/// Size-weighted average price of consuming `qty` from `levels`.
/// `None` when the visible depth cannot fill the quantity.
fn walk_book(levels: &[ordx_core::L2Level], qty: Qty) -> Option<Price> {
    let mut remaining = qty.inner();
    let mut cost = Decimal::ZERO;

    for level in levels {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(level.qty.inner());
        cost += take * level.price.inner();
        remaining -= take;
    }

    if remaining > Decimal::ZERO {
        return None;
    }
    Some(Price::new(cost / qty.inner()))
}
