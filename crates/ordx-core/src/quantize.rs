//! Instrument quantizer.
//!
//! Turns raw strategy quantities and prices into venue-legal values.
//! Rounding is always toward the caller's limit: quantity down, buy prices
//! down, sell prices up. A quantized order can never be larger or more
//! aggressive than what was asked for.

use rust_decimal::Decimal;

use crate::decimal::{Price, Qty};
use crate::instrument::InstrumentMetadata;
use crate::intent::{OrderSide, QuantizedIntent};
use crate::reject::RejectReason;

/// Quantize a raw intent against instrument metadata.
///
/// Pure and side-effect free; a rejection leaves nothing behind.
pub fn quantize(
    meta: &InstrumentMetadata,
    side: OrderSide,
    raw_qty: Qty,
    raw_limit_price: Price,
) -> Result<QuantizedIntent, RejectReason> {
    meta.validate()?;

    if !raw_qty.is_positive() {
        return Err(RejectReason::InvalidInput(format!(
            "raw_qty must be positive, got {raw_qty}"
        )));
    }
    if !raw_limit_price.is_positive() {
        return Err(RejectReason::InvalidInput(format!(
            "raw_limit_price must be positive, got {raw_limit_price}"
        )));
    }

    let qty_steps = raw_qty
        .lot_count(meta.lot_size)
        .ok_or(RejectReason::InstrumentMetadataMissing)?;
    let qty_q = meta.lot_size * Decimal::from(qty_steps);
    let qty_q = Qty::new(qty_q.inner());

    if qty_q < meta.min_qty || qty_q.is_zero() {
        return Err(RejectReason::TooSmallAfterQuantization);
    }

    if meta.kind.is_contract_sized() {
        let contracts = qty_q.inner() / meta.contract_multiplier;
        if contracts != contracts.floor() {
            return Err(RejectReason::ContractsAmountMismatch);
        }
    }

    let limit_price_q = match side {
        OrderSide::Buy => raw_limit_price.floor_to_tick(meta.tick_size),
        OrderSide::Sell => raw_limit_price.ceil_to_tick(meta.tick_size),
    };
    if !limit_price_q.is_positive() {
        // A buy limit below one tick floors to zero.
        return Err(RejectReason::InvalidInput(format!(
            "limit price {raw_limit_price} quantizes to zero"
        )));
    }
    let price_ticks = limit_price_q
        .tick_count(meta.tick_size)
        .ok_or(RejectReason::InstrumentMetadataMissing)?;

    Ok(QuantizedIntent {
        qty_q,
        limit_price_q,
        qty_steps,
        price_ticks,
    })
}
