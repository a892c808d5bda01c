//! Reconnect label matching.
//!
//! After a reconnect the venue shows open orders; the ledger shows what we
//! believe is ours. Matching goes through a fixed tie-break sequence, and a
//! filter that would empty the candidate set is skipped rather than applied:
//! losing all candidates to one noisy attribute must not hide a real match.
//! More than one survivor is an ambiguity, never a guess.

use ordx_core::{OrderSide, Qty};
use tracing::warn;

use crate::label::{decode_label, LabelParts};

/// An open order as reported by the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueOrder {
    pub order_id: String,
    pub label: Option<String>,
    pub instrument_id: String,
    pub side: OrderSide,
    pub qty: Qty,
}

/// What we expect the venue order to look like, from a ledger record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedOrder {
    pub label_parts: LabelParts,
    pub instrument_id: String,
    pub side: OrderSide,
    pub qty_q: Qty,
}

/// Result of a match attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { order_id: String },
    NoMatch,
    Ambiguous { candidates: Vec<String> },
}

/// Match one expected order against the venue's open orders.
pub fn match_order(expected: &ExpectedOrder, venue_orders: &[VenueOrder]) -> MatchOutcome {
    // Primary key: group fragment + leg index from a decodable label.
    // No narrowing here; an order that fails this is simply not ours.
    let mut candidates: Vec<(&VenueOrder, LabelParts)> = venue_orders
        .iter()
        .filter_map(|order| {
            let label = order.label.as_deref()?;
            let parts = decode_label(label).ok()?;
            (parts.gid12 == expected.label_parts.gid12
                && parts.leg_idx == expected.label_parts.leg_idx)
                .then_some((order, parts))
        })
        .collect();

    if candidates.is_empty() {
        return MatchOutcome::NoMatch;
    }

    narrow_if_any(&mut candidates, |(_, parts)| {
        parts.ih16 == expected.label_parts.ih16
    });
    narrow_if_any(&mut candidates, |(order, _)| {
        order.instrument_id == expected.instrument_id
    });
    narrow_if_any(&mut candidates, |(order, _)| order.side == expected.side);
    narrow_if_any(&mut candidates, |(order, _)| order.qty == expected.qty_q);

    match candidates.len() {
        1 => MatchOutcome::Matched {
            order_id: candidates[0].0.order_id.clone(),
        },
        n => {
            let ids: Vec<String> = candidates
                .iter()
                .map(|(o, _)| o.order_id.clone())
                .collect();
            warn!(
                survivors = n,
                gid12 = %expected.label_parts.gid12,
                leg_idx = expected.label_parts.leg_idx,
                "label match ambiguous"
            );
            ordx_telemetry::metrics::LABEL_MATCH_AMBIGUITY_TOTAL.inc();
            MatchOutcome::Ambiguous { candidates: ids }
        }
    }
}

/// Apply the filter only if it leaves at least one candidate.
fn narrow_if_any<T>(candidates: &mut Vec<T>, pred: impl Fn(&T) -> bool) {
    if candidates.iter().any(&pred) {
        candidates.retain(|c| pred(c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::encode_label_fragments;
    use rust_decimal_macros::dec;

    fn expected() -> ExpectedOrder {
        ExpectedOrder {
            label_parts: LabelParts {
                sid8: "stratalp".to_string(),
                gid12: "9f2b1c4d77aa".to_string(),
                leg_idx: 0,
                ih16: "deadbeefcafef00d".to_string(),
            },
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            qty_q: Qty::new(dec!(0.01)),
        }
    }

    fn venue_order(order_id: &str, gid: &str, leg: u32, ih16: &str) -> VenueOrder {
        VenueOrder {
            order_id: order_id.to_string(),
            label: Some(encode_label_fragments("stratalp", gid, leg, ih16).unwrap()),
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            qty: Qty::new(dec!(0.01)),
        }
    }

    #[test]
    fn test_exact_match() {
        let orders = vec![
            venue_order("o-1", "9f2b1c4d77aa", 0, "deadbeefcafef00d"),
            venue_order("o-2", "9f2b1c4d77aa", 1, "1111111111111111"),
        ];
        assert_eq!(
            match_order(&expected(), &orders),
            MatchOutcome::Matched {
                order_id: "o-1".to_string()
            }
        );
    }

    #[test]
    fn test_no_candidates() {
        let orders = vec![venue_order("o-1", "otherg", 0, "deadbeefcafef00d")];
        assert_eq!(match_order(&expected(), &orders), MatchOutcome::NoMatch);

        // Unlabeled orders are never candidates.
        let mut unlabeled = venue_order("o-2", "9f2b1c4d77aa", 0, "deadbeefcafef00d");
        unlabeled.label = None;
        assert_eq!(
            match_order(&expected(), &[unlabeled]),
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn test_hash_fragment_breaks_tie() {
        let orders = vec![
            venue_order("o-1", "9f2b1c4d77aa", 0, "1111111111111111"),
            venue_order("o-2", "9f2b1c4d77aa", 0, "deadbeefcafef00d"),
        ];
        assert_eq!(
            match_order(&expected(), &orders),
            MatchOutcome::Matched {
                order_id: "o-2".to_string()
            }
        );
    }

    #[test]
    fn test_empty_filter_is_skipped() {
        // Neither candidate matches the hash fragment; the hash filter is
        // skipped and the qty filter decides.
        let mut a = venue_order("o-1", "9f2b1c4d77aa", 0, "1111111111111111");
        a.qty = Qty::new(dec!(0.02));
        let b = venue_order("o-2", "9f2b1c4d77aa", 0, "2222222222222222");
        assert_eq!(
            match_order(&expected(), &[a, b]),
            MatchOutcome::Matched {
                order_id: "o-2".to_string()
            }
        );
    }

    #[test]
    fn test_indistinguishable_candidates_are_ambiguous() {
        let orders = vec![
            venue_order("o-1", "9f2b1c4d77aa", 0, "deadbeefcafef00d"),
            venue_order("o-2", "9f2b1c4d77aa", 0, "deadbeefcafef00d"),
        ];
        let outcome = match_order(&expected(), &orders);
        assert_eq!(
            outcome,
            MatchOutcome::Ambiguous {
                candidates: vec!["o-1".to_string(), "o-2".to_string()]
            }
        );
    }
}
