//! Fee cache staleness.
//!
//! Fees drift slowly but matter at the edge. A soft-stale cache pads the
//! rate; a hard-stale cache degrades the risk signal so dispatch
//! authorization stops Opens until the cache refreshes. The gate itself
//! never rejects.

use ordx_core::RiskSignal;
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::FeeStalenessConfig;

/// Outcome of a staleness evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeStalenessDecision {
    pub cache_age_s: u64,
    pub fee_rate_effective: Decimal,
    pub signal: RiskSignal,
    soft_stale: bool,
    hard_stale: bool,
}

impl FeeStalenessDecision {
    #[must_use]
    pub fn is_soft_stale(self) -> bool {
        self.soft_stale
    }

    #[must_use]
    pub fn is_hard_stale(self) -> bool {
        self.hard_stale
    }
}

/// Evaluate fee cache age against the configured windows.
///
/// A missing cache timestamp, or one in the future, counts as hard-stale:
/// an unknowable age gets the worst interpretation.
pub fn evaluate_fee_staleness(
    fee_rate: Decimal,
    now_ms: u64,
    cached_at_ms: Option<u64>,
    config: &FeeStalenessConfig,
) -> FeeStalenessDecision {
    let age_s = match cached_at_ms {
        Some(cached_at) if now_ms >= cached_at => (now_ms - cached_at) / 1_000,
        _ => config.hard_s + 1,
    };

    let hard_stale = age_s > config.hard_s;
    let soft_stale = !hard_stale && age_s > config.soft_s;

    let fee_rate_effective = if soft_stale {
        fee_rate * (Decimal::ONE + config.stale_buffer)
    } else {
        fee_rate
    };

    let signal = if hard_stale {
        warn!(age_s, hard_s = config.hard_s, "fee cache hard-stale");
        RiskSignal::Degraded
    } else {
        RiskSignal::Healthy
    };

    FeeStalenessDecision {
        cache_age_s: age_s,
        fee_rate_effective,
        signal,
        soft_stale,
        hard_stale,
    }
}
