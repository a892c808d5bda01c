//! Gate configuration.
//!
//! Every safety threshold is an explicit field with an explicit default.
//! Nothing here reads the environment; the caller loads and passes config.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{GateError, GateResult};

fn default_max_slippage_bps() -> Decimal {
    Decimal::from(10)
}

fn default_l2_snapshot_max_age_ms() -> u64 {
    1_000
}

fn default_min_edge() -> Decimal {
    Decimal::ZERO
}

fn default_false() -> bool {
    false
}

/// Thresholds for the gate pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Maximum tolerable expected slippage for an Open, in bps of best price.
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: Decimal,

    /// Maximum age of an L2 snapshot before it no longer counts as liquidity.
    #[serde(default = "default_l2_snapshot_max_age_ms")]
    pub l2_snapshot_max_age_ms: u64,

    /// Minimum acceptable net edge, in quote currency per unit.
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,

    /// Venue reports support for linked (OCO/OTO) orders.
    #[serde(default = "default_false")]
    pub linked_orders_supported: bool,

    /// Operator has enabled linked orders for this deployment.
    /// Both this and `linked_orders_supported` must hold.
    #[serde(default = "default_false")]
    pub enable_linked_orders: bool,

    #[serde(default)]
    pub fee_staleness: FeeStalenessConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_slippage_bps: default_max_slippage_bps(),
            l2_snapshot_max_age_ms: default_l2_snapshot_max_age_ms(),
            min_edge: default_min_edge(),
            linked_orders_supported: default_false(),
            enable_linked_orders: default_false(),
            fee_staleness: FeeStalenessConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> GateResult<()> {
        if self.max_slippage_bps.is_sign_negative() {
            return Err(GateError::InvalidConfig(
                "max_slippage_bps must be >= 0".to_string(),
            ));
        }
        if self.min_edge.is_sign_negative() {
            return Err(GateError::InvalidConfig(
                "min_edge must be >= 0".to_string(),
            ));
        }
        self.fee_staleness.validate()
    }
}

fn default_fee_soft_s() -> u64 {
    300
}

fn default_fee_hard_s() -> u64 {
    900
}

fn default_fee_stale_buffer() -> Decimal {
    // 20% haircut on top of a soft-stale fee rate.
    Decimal::new(20, 2)
}

/// Fee cache staleness thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeStalenessConfig {
    #[serde(default = "default_fee_soft_s")]
    pub soft_s: u64,

    #[serde(default = "default_fee_hard_s")]
    pub hard_s: u64,

    /// Multiplier applied to the fee rate while soft-stale: `rate * (1 + buffer)`.
    #[serde(default = "default_fee_stale_buffer")]
    pub stale_buffer: Decimal,
}

impl Default for FeeStalenessConfig {
    fn default() -> Self {
        Self {
            soft_s: default_fee_soft_s(),
            hard_s: default_fee_hard_s(),
            stale_buffer: default_fee_stale_buffer(),
        }
    }
}

impl FeeStalenessConfig {
    pub fn validate(&self) -> GateResult<()> {
        if self.soft_s > self.hard_s {
            return Err(GateError::InvalidConfig(format!(
                "fee soft_s {} exceeds hard_s {}",
                self.soft_s, self.hard_s
            )));
        }
        if self.stale_buffer.is_sign_negative() {
            return Err(GateError::InvalidConfig(
                "fee stale_buffer must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}
