//! Net edge gate.
//!
//! Applies only to risk-increasing intents. The inputs arrive as options
//! because upstream models can be cold; a missing input is a reject, never
//! a default.

use ordx_core::{IntentClass, RejectReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inputs to the net edge computation, per unit in quote currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetEdgeInputs {
    pub gross_edge: Option<Decimal>,
    pub fee_cost: Option<Decimal>,
    pub slippage_cost: Option<Decimal>,
    pub min_edge: Option<Decimal>,
}

/// Computed net edge for an Open; `None` when the class is not gated.
pub fn net_edge_gate(
    class: IntentClass,
    inputs: &NetEdgeInputs,
) -> Result<Option<Decimal>, RejectReason> {
    if class != IntentClass::Open {
        return Ok(None);
    }

    let (Some(gross), Some(fee), Some(slippage), Some(min_edge)) = (
        inputs.gross_edge,
        inputs.fee_cost,
        inputs.slippage_cost,
        inputs.min_edge,
    ) else {
        return Err(RejectReason::NetEdgeInputMissing);
    };

    let net = gross - fee - slippage;
    if net < min_edge {
        return Err(RejectReason::NetEdgeTooLow);
    }
    Ok(Some(net))
}
