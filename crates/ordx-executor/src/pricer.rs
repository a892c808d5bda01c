//! Bounded-aggression IOC pricing.
//!
//! An IOC limit wants to fill now, but never at "any price": the limit is
//! derived from fair value and clamped at the price where the configured
//! minimum edge still survives fees. Half the net edge is given up as
//! aggression; the other half is kept. The output can therefore miss, but
//! it can never degenerate into a market order.

use ordx_core::{OrderSide, Price, RejectReason};
use rust_decimal::Decimal;

/// Per-unit economics feeding the pricer, in quote currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricerInputs {
    pub fair_price: Price,
    pub gross_edge_per_unit: Decimal,
    pub fee_per_unit: Decimal,
    pub min_edge_per_unit: Decimal,
}

/// A priced IOC limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IocQuote {
    pub limit_price: Price,
    /// The furthest price at which the minimum edge still holds.
    pub worst_acceptable: Price,
    pub net_edge_per_unit: Decimal,
}

/// Price an IOC limit for the given side.
///
/// Tick rounding goes toward fair (buy down, sell up) so rounding can only
/// make the order less aggressive, never break the edge bound.
pub fn price_ioc_limit(
    side: OrderSide,
    inputs: &PricerInputs,
    tick_size: Price,
) -> Result<IocQuote, RejectReason> {
    if !inputs.fair_price.is_positive() {
        return Err(RejectReason::InvalidInput(format!(
            "fair price must be positive, got {}",
            inputs.fair_price
        )));
    }

    let net = inputs.gross_edge_per_unit - inputs.fee_per_unit;
    if net < inputs.min_edge_per_unit {
        return Err(RejectReason::NetEdgeTooLow);
    }

    // Edge decays one-for-one with price moved past fair.
    let headroom = net - inputs.min_edge_per_unit;
    let aggression = net / Decimal::TWO;

    let fair = inputs.fair_price.inner();
    let (proposed, worst) = match side {
        OrderSide::Buy => (fair + aggression.min(headroom), fair + headroom),
        OrderSide::Sell => (fair - aggression.min(headroom), fair - headroom),
    };

    let (limit_price, worst_acceptable) = match side {
        OrderSide::Buy => (
            Price::new(proposed).floor_to_tick(tick_size),
            Price::new(worst).floor_to_tick(tick_size),
        ),
        OrderSide::Sell => (
            Price::new(proposed).ceil_to_tick(tick_size),
            Price::new(worst).ceil_to_tick(tick_size),
        ),
    };

    if !limit_price.is_positive() {
        return Err(RejectReason::InvalidInput(
            "priced limit quantizes to zero".to_string(),
        ));
    }

    Ok(IocQuote {
        limit_price,
        worst_acceptable,
        net_edge_per_unit: net,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inputs() -> PricerInputs {
        PricerInputs {
            fair_price: Price::new(dec!(100)),
            gross_edge_per_unit: dec!(10),
            fee_per_unit: dec!(2),
            min_edge_per_unit: dec!(4),
        }
    }

    #[test]
    fn test_buy_gives_up_half_the_net() {
        // net = 8, aggression 4, headroom 4.
        let quote = price_ioc_limit(OrderSide::Buy, &inputs(), Price::new(dec!(0.5))).unwrap();
        assert_eq!(quote.limit_price.inner(), dec!(104.0));
        assert_eq!(quote.worst_acceptable.inner(), dec!(104.0));
        assert_eq!(quote.net_edge_per_unit, dec!(8));
    }

    #[test]
    fn test_sell_mirrors_buy() {
        let quote = price_ioc_limit(OrderSide::Sell, &inputs(), Price::new(dec!(0.5))).unwrap();
        assert_eq!(quote.limit_price.inner(), dec!(96.0));
    }

    #[test]
    fn test_clamped_at_min_edge_boundary() {
        // net = 8, min 6: headroom 2 < aggression 4, so the clamp binds.
        let mut i = inputs();
        i.min_edge_per_unit = dec!(6);
        let quote = price_ioc_limit(OrderSide::Buy, &i, Price::new(dec!(0.5))).unwrap();
        assert_eq!(quote.limit_price.inner(), dec!(102.0));
    }

    #[test]
    fn test_rejects_when_net_below_min() {
        let mut i = inputs();
        i.fee_per_unit = dec!(7); // net 3 < min 4
        assert_eq!(
            price_ioc_limit(OrderSide::Buy, &i, Price::new(dec!(0.5))).unwrap_err(),
            RejectReason::NetEdgeTooLow
        );
    }

    #[test]
    fn test_tick_rounding_is_never_more_aggressive() {
        let mut i = inputs();
        i.gross_edge_per_unit = dec!(9.3); // net 7.3, aggression 3.65
        let tick = Price::new(dec!(0.5));

        let buy = price_ioc_limit(OrderSide::Buy, &i, tick).unwrap();
        assert!(buy.limit_price.inner() <= dec!(103.65));
        assert_eq!(buy.limit_price.inner(), dec!(103.5));

        let sell = price_ioc_limit(OrderSide::Sell, &i, tick).unwrap();
        assert!(sell.limit_price.inner() >= dec!(96.35));
        assert_eq!(sell.limit_price.inner(), dec!(96.5));
    }

    #[test]
    fn test_zero_min_edge_still_bounded() {
        let mut i = inputs();
        i.min_edge_per_unit = dec!(0);
        let quote = price_ioc_limit(OrderSide::Buy, &i, Price::new(dec!(0.5))).unwrap();
        // Aggression is half the net, well inside the headroom of 8.
        assert_eq!(quote.limit_price.inner(), dec!(104.0));
        assert_eq!(quote.worst_acceptable.inner(), dec!(108.0));
    }

    #[test]
    fn test_non_positive_fair_rejected() {
        let mut i = inputs();
        i.fair_price = Price::ZERO;
        assert!(matches!(
            price_ioc_limit(OrderSide::Buy, &i, Price::new(dec!(0.5))),
            Err(RejectReason::InvalidInput(_))
        ));
    }
}
