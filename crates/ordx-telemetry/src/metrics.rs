//! Prometheus metrics for the execution core.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

/// Rejections by typed reason label.
pub static INTENT_REJECTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ordx_intent_rejects_total",
        "Intents rejected before dispatch",
        &["reason"]
    )
    .unwrap()
});

/// Intents that made it through the full gate sequence and were dispatched.
pub static INTENTS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ordx_intents_dispatched_total",
        "Intents dispatched to the venue",
        &["class"]
    )
    .unwrap()
});

/// Duplicate intents suppressed by the idempotency check.
pub static INTENTS_DUPLICATE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_intents_duplicate_total",
        "Intents suppressed as already in flight"
    )
    .unwrap()
});

/// Current WAL append queue depth.
pub static WAL_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ordx_wal_queue_depth", "Intent WAL append queue depth").unwrap()
});

/// Configured WAL queue capacity.
pub static WAL_QUEUE_CAPACITY: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "ordx_wal_queue_capacity",
        "Intent WAL append queue capacity"
    )
    .unwrap()
});

/// Appends refused because the queue was full.
pub static WAL_ENQUEUE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_wal_enqueue_failures_total",
        "WAL appends refused on a full queue"
    )
    .unwrap()
});

/// Duplicate trade ids observed by the registry.
pub static TRADE_ID_DUPLICATES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_trade_id_duplicates_total",
        "Duplicate trade ids suppressed"
    )
    .unwrap()
});

/// Lifecycle events that arrived out of order (absorbed, not errored).
pub static TLSM_OUT_OF_ORDER_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_tlsm_out_of_order_total",
        "Out-of-order lifecycle observations"
    )
    .unwrap()
});

/// Reconnect label matches that ended ambiguous.
pub static LABEL_MATCH_AMBIGUITY_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_label_match_ambiguity_total",
        "Label matches narrowed to more than one candidate"
    )
    .unwrap()
});

/// Fee cache age as seen at the last staleness evaluation.
pub static FEE_CACHE_AGE_SECONDS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "ordx_fee_cache_age_seconds",
        "Fee model cache age at last evaluation"
    )
    .unwrap()
});

/// Metadata cache reads that returned a stale entry.
pub static METADATA_STALE_READS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ordx_metadata_stale_reads_total",
        "Instrument metadata reads past TTL"
    )
    .unwrap()
});
