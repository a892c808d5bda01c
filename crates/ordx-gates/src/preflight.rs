//! Preflight: order-type guard and post-only cross check.
//!
//! Runs before quantization. The execution core only ever emits resting or
//! IOC limit orders; anything that could take liquidity unconditionally is
//! refused here, before any other work happens.

use ordx_core::{IntentClass, L2Snapshot, RawIntent, RejectReason};
use tracing::debug;

use crate::config::GateConfig;

/// Validate the requested order profile.
///
/// Cancel intents are exempt: cancelling an order has no order type of
/// its own.
pub fn preflight(
    intent: &RawIntent,
    book: Option<&L2Snapshot>,
    config: &GateConfig,
) -> Result<(), RejectReason> {
    if intent.class == IntentClass::Cancel {
        return Ok(());
    }

    match intent.order_type {
        ordx_core::OrderType::Market => {
            debug!(instrument_id = %intent.instrument_id, "market order refused at preflight");
            return Err(RejectReason::OrderTypeMarketForbidden);
        }
        ordx_core::OrderType::StopLimit | ordx_core::OrderType::StopMarket => {
            debug!(instrument_id = %intent.instrument_id, "stop order refused at preflight");
            return Err(RejectReason::OrderTypeStopForbidden);
        }
        ordx_core::OrderType::Limit => {}
    }

    if intent.linked.is_some() && !(config.linked_orders_supported && config.enable_linked_orders) {
        return Err(RejectReason::LinkedOrderTypeForbidden);
    }

    if intent.post_only {
        check_post_only_cross(intent, book)?;
    }

    Ok(())
}

/// A post-only limit priced through the touch would either be rejected by
/// the venue or, worse, silently repriced. Refuse it here instead.
fn check_post_only_cross(
    intent: &RawIntent,
    book: Option<&L2Snapshot>,
) -> Result<(), RejectReason> {
    let Some(book) = book else {
        // No book means the liquidity gate will refuse this intent anyway;
        // nothing to cross against.
        return Ok(());
    };

    let crosses = match intent.side {
        ordx_core::OrderSide::Buy => book
            .best_ask()
            .is_some_and(|ask| intent.raw_limit_price >= ask.price),
        ordx_core::OrderSide::Sell => book
            .best_bid()
            .is_some_and(|bid| intent.raw_limit_price <= bid.price),
    };

    if crosses {
        debug!(
            instrument_id = %intent.instrument_id,
            side = %intent.side,
            limit = %intent.raw_limit_price,
            "post-only limit crosses the touch"
        );
        return Err(RejectReason::PostOnlyWouldCross);
    }
    Ok(())
}
