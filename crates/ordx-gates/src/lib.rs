//! Pre-dispatch gate pipeline.
//!
//! Four pure gates, one fixed order, one legal caller (the chokepoint):
//! preflight, liquidity, net edge, fee staleness. Gates take snapshots and
//! timestamps as arguments and never touch a clock or a socket themselves.

pub mod config;
pub mod error;
pub mod fees;
pub mod liquidity;
pub mod net_edge;
pub mod preflight;

pub use config::{FeeStalenessConfig, GateConfig};
pub use error::{GateError, GateResult};
pub use fees::{evaluate_fee_staleness, FeeStalenessDecision};
pub use liquidity::{liquidity_gate, FairPriceSource, LiquidityVerdict};
pub use net_edge::{net_edge_gate, NetEdgeInputs};
pub use preflight::preflight;
