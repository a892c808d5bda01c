//! Coarse risk signal and the trading mode it implies.
//!
//! The execution core consumes the signal; it never computes one. Policy
//! engines, fee staleness, and cache staleness all feed the same four-level
//! scale, and the worst contribution wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse health signal supplied per evaluation.
///
/// Ordering is severity: `Healthy < Degraded < Maintenance < Kill`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskSignal {
    #[default]
    Healthy,
    Degraded,
    Maintenance,
    Kill,
}

impl RiskSignal {
    /// Combine two contributions; the worse one wins.
    #[must_use]
    pub fn combine(self, other: RiskSignal) -> RiskSignal {
        self.max(other)
    }

    #[must_use]
    pub fn trading_mode(self) -> TradingMode {
        match self {
            RiskSignal::Healthy => TradingMode::Active,
            RiskSignal::Degraded | RiskSignal::Maintenance => TradingMode::ReduceOnly,
            RiskSignal::Kill => TradingMode::Kill,
        }
    }

    /// Only a fully healthy signal authorizes risk-increasing orders.
    #[must_use]
    pub fn allows_open(self) -> bool {
        self.trading_mode() == TradingMode::Active
    }

    /// Risk-reducing actions stay allowed until kill.
    #[must_use]
    pub fn allows_close(self) -> bool {
        self.trading_mode() != TradingMode::Kill
    }
}

impl fmt::Display for RiskSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskSignal::Healthy => "healthy",
            RiskSignal::Degraded => "degraded",
            RiskSignal::Maintenance => "maintenance",
            RiskSignal::Kill => "kill",
        };
        f.write_str(s)
    }
}

/// What the current signal permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    Active,
    ReduceOnly,
    Kill,
}
