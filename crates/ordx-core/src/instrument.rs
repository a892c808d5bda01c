//! Instrument metadata and its TTL cache.
//!
//! Metadata is the quantizer's ground truth. Anything invalid here is
//! treated exactly like missing metadata: the intent is refused rather
//! than quantized against garbage.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decimal::{Price, Qty};
use crate::reject::RejectReason;
use crate::risk::RiskSignal;

/// Instrument kind as understood by the sizing logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Option,
    LinearFuture,
    InverseFuture,
    Perpetual,
}

impl InstrumentKind {
    /// Parse the venue's kind string. Coin-margined perpetuals ("perpetual"
    /// with reversed settlement) size like inverse futures; USD-margined
    /// ones size linearly, so the plain tag maps to `Perpetual` and the
    /// metadata's contract multiplier carries the rest.
    #[must_use]
    pub fn from_venue_tag(tag: &str) -> Option<Self> {
        match tag {
            "option" => Some(InstrumentKind::Option),
            "linear_future" | "future_linear" => Some(InstrumentKind::LinearFuture),
            "inverse_future" | "future_reversed" => Some(InstrumentKind::InverseFuture),
            "perpetual" => Some(InstrumentKind::Perpetual),
            _ => None,
        }
    }

    /// Whether quantity is expressed in contracts that must agree with the
    /// amount via the contract multiplier.
    #[must_use]
    pub fn is_contract_sized(self) -> bool {
        matches!(
            self,
            InstrumentKind::LinearFuture | InstrumentKind::InverseFuture | InstrumentKind::Perpetual
        )
    }

    /// Whether trigger fields are meaningful for this kind at all.
    #[must_use]
    pub fn supports_triggers(self) -> bool {
        !matches!(self, InstrumentKind::Option)
    }
}

/// Static per-instrument quantization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    pub instrument_id: String,
    pub kind: InstrumentKind,
    pub tick_size: Price,
    pub lot_size: Qty,
    pub min_qty: Qty,
    pub contract_multiplier: Decimal,
}

impl InstrumentMetadata {
    /// Fail-closed validation: a non-positive tick or lot, or a negative
    /// minimum, makes the metadata unusable and the instrument untradeable.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if !self.tick_size.is_positive()
            || !self.lot_size.is_positive()
            || self.min_qty.inner().is_sign_negative()
            || self.contract_multiplier <= Decimal::ZERO
        {
            return Err(RejectReason::InstrumentMetadataMissing);
        }
        Ok(())
    }
}

/// A cache read: the metadata plus the signal its age implies.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMetadata {
    pub meta: InstrumentMetadata,
    pub signal: RiskSignal,
    pub age_ms: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    meta: InstrumentMetadata,
    cached_at_ms: u64,
}

/// TTL cache over instrument metadata.
///
/// A stale entry is still returned; staleness is surfaced as
/// `RiskSignal::Degraded` so dispatch authorization can act on it instead
/// of the cache silently masking the problem.
pub struct MetadataCache {
    entries: DashMap<String, CacheEntry>,
    ttl_ms: u64,
}

impl MetadataCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms,
        }
    }

    /// Insert or refresh. Invalid metadata is dropped, not cached.
    pub fn insert(&self, meta: InstrumentMetadata, now_ms: u64) -> Result<(), RejectReason> {
        meta.validate()?;
        self.entries.insert(
            meta.instrument_id.clone(),
            CacheEntry {
                meta,
                cached_at_ms: now_ms,
            },
        );
        Ok(())
    }

    /// Look up metadata. A clock running backwards counts as stale.
    pub fn get(&self, instrument_id: &str, now_ms: u64) -> Option<CachedMetadata> {
        let entry = self.entries.get(instrument_id)?;
        let age_ms = now_ms.checked_sub(entry.cached_at_ms).unwrap_or(u64::MAX);
        let signal = if age_ms > self.ttl_ms {
            warn!(
                instrument_id,
                age_ms,
                ttl_ms = self.ttl_ms,
                "stale instrument metadata read"
            );
            RiskSignal::Degraded
        } else {
            RiskSignal::Healthy
        };
        Some(CachedMetadata {
            meta: entry.meta.clone(),
            signal,
            age_ms,
        })
    }

    pub fn contains(&self, instrument_id: &str) -> bool {
        self.entries.contains_key(instrument_id)
    }

    pub fn remove(&self, instrument_id: &str) -> Option<InstrumentMetadata> {
        self.entries.remove(instrument_id).map(|(_, e)| e.meta)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn meta() -> InstrumentMetadata {
        InstrumentMetadata {
            instrument_id: "BTC-PERPETUAL".to_string(),
            kind: InstrumentKind::Perpetual,
            tick_size: Price::new(dec!(0.5)),
            lot_size: Qty::new(dec!(0.01)),
            min_qty: Qty::new(dec!(0.01)),
            contract_multiplier: dec!(1),
        }
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let mut m = meta();
        m.tick_size = Price::ZERO;
        assert_eq!(m.validate(), Err(RejectReason::InstrumentMetadataMissing));
    }

    #[test]
    fn test_validate_rejects_negative_min() {
        let mut m = meta();
        m.min_qty = Qty::new(dec!(-0.01));
        assert_eq!(m.validate(), Err(RejectReason::InstrumentMetadataMissing));
    }

    #[test]
    fn test_cache_fresh_read_is_healthy() {
        let cache = MetadataCache::new(60_000);
        cache.insert(meta(), 1_000).unwrap();

        let read = cache.get("BTC-PERPETUAL", 30_000).unwrap();
        assert_eq!(read.signal, RiskSignal::Healthy);
        assert_eq!(read.age_ms, 29_000);
    }

    #[test]
    fn test_cache_stale_read_degrades_but_returns() {
        let cache = MetadataCache::new(60_000);
        cache.insert(meta(), 1_000).unwrap();

        let read = cache.get("BTC-PERPETUAL", 100_000).unwrap();
        assert_eq!(read.signal, RiskSignal::Degraded);
        assert_eq!(read.meta.instrument_id, "BTC-PERPETUAL");
    }

    #[test]
    fn test_cache_backwards_clock_degrades() {
        let cache = MetadataCache::new(60_000);
        cache.insert(meta(), 50_000).unwrap();

        let read = cache.get("BTC-PERPETUAL", 10_000).unwrap();
        assert_eq!(read.signal, RiskSignal::Degraded);
    }

    #[test]
    fn test_cache_refuses_invalid_metadata() {
        let cache = MetadataCache::new(60_000);
        let mut m = meta();
        m.lot_size = Qty::ZERO;
        assert!(cache.insert(m, 0).is_err());
        assert!(cache.get("BTC-PERPETUAL", 0).is_none());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            InstrumentKind::from_venue_tag("future_reversed"),
            Some(InstrumentKind::InverseFuture)
        );
        assert_eq!(InstrumentKind::from_venue_tag("spread"), None);
    }
}
