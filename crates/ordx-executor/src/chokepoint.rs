//! The build-intent chokepoint.
//!
//! Every order the process ever sends passes through `submit`, in one
//! fixed sequence: preflight, quantize, idempotency, fee state, liquidity,
//! net edge, pricing, WAL, dispatch. A failure anywhere halts the intent
//! with zero side effects; the first write of any kind is the WAL record,
//! and dispatch happens only after that record is accepted.

use std::collections::HashSet;
use std::sync::Arc;

use ordx_core::{
    quantize, IntentClass, L2Snapshot, LifecycleState, MetadataCache, OrderSide, Price, Qty,
    RawIntent, RejectReason, RiskSignal, TimeInForce,
};
use ordx_gates::{
    evaluate_fee_staleness, liquidity_gate, net_edge_gate, preflight, FairPriceSource, GateConfig,
    NetEdgeInputs,
};
use ordx_ledger::{IntentWal, LedgerError, ReplaySummary, WalRecord};
use ordx_telemetry::metrics;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::error::{ExecutorError, ExecutorResult};
use crate::idempotency::{intent_hash, IntentHashInput};
use crate::label::encode_label;
use crate::pricer::{price_ioc_limit, PricerInputs};
use crate::reconcile::ReconcileAction;

/// Venue dispatch seam. The chokepoint never talks to a transport
/// directly; it hands a fully-formed order to this trait.
#[cfg_attr(test, mockall::automock)]
pub trait Dispatcher {
    fn dispatch(&self, order: &DispatchOrder) -> Result<(), String>;
}

/// Everything the venue needs to place (or cancel) the order.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOrder {
    pub intent_hash: u64,
    pub instrument_id: String,
    pub side: OrderSide,
    pub class: IntentClass,
    pub qty: Qty,
    pub limit_price: Price,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub label: String,
}

/// Per-evaluation inputs the chokepoint does not own: market state, model
/// outputs, and the caller's risk signal.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub now_ms: u64,
    pub book: Option<&'a L2Snapshot>,
    pub risk_signal: RiskSignal,
    pub fair_price: Option<Price>,
    pub gross_edge_per_unit: Option<Decimal>,
    /// Taker fee rate as a fraction of notional.
    pub fee_rate: Decimal,
    pub fee_cached_at_ms: Option<u64>,
}

/// Why a submit did nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    AlreadyInFlight,
}

/// Result of a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Dispatched {
        intent_hash: u64,
        label: String,
        qty: Qty,
        limit_price: Price,
    },
    Rejected(RejectReason),
    Noop(NoopReason),
}

struct Prepared {
    record: WalRecord,
    order: DispatchOrder,
}

enum Evaluated {
    Prepared(Box<Prepared>),
    Duplicate(u64),
}

/// The single legal entry point to dispatch.
///
/// The idempotency projection is two sets: `in_flight` holds hashes whose
/// dispatch is recorded but not yet settled (releasable once reconciliation
/// proves the venue never saw them), `retired` holds hashes that were sent
/// or reached a settled terminal state and may never dispatch again for the
/// life of the process.
pub struct Chokepoint<D: Dispatcher> {
    strategy_id: String,
    config: GateConfig,
    metadata: Arc<MetadataCache>,
    wal: Arc<IntentWal>,
    dispatcher: D,
    in_flight: Mutex<HashSet<u64>>,
    retired: Mutex<HashSet<u64>>,
    open_block: Mutex<Option<RejectReason>>,
}

impl<D: Dispatcher> Chokepoint<D> {
    pub fn new(
        strategy_id: impl Into<String>,
        config: GateConfig,
        metadata: Arc<MetadataCache>,
        wal: Arc<IntentWal>,
        dispatcher: D,
    ) -> ExecutorResult<Self> {
        config.validate()?;
        metrics::WAL_QUEUE_CAPACITY.set(wal.queue_capacity() as i64);
        Ok(Self {
            strategy_id: strategy_id.into(),
            config,
            metadata,
            wal,
            dispatcher,
            in_flight: Mutex::new(HashSet::new()),
            retired: Mutex::new(HashSet::new()),
            open_block: Mutex::new(None),
        })
    }

    /// Seed the idempotency projection from a startup replay. Every hash in
    /// the log lands in one of the two sets, so a previously seen canonical
    /// intent can never dispatch again without reconciliation: records still
    /// awaiting it go in flight, everything else (sent or settled terminal)
    /// is retired outright.
    pub fn seed_from_replay(&self, summary: &ReplaySummary) {
        let mut in_flight = self.in_flight.lock();
        let mut retired = self.retired.lock();
        for record in &summary.latest {
            if record.needs_reconciliation() {
                in_flight.insert(record.intent_hash);
            } else {
                retired.insert(record.intent_hash);
            }
        }
        info!(
            in_flight = in_flight.len(),
            retired = retired.len(),
            "idempotency projection seeded"
        );
    }

    /// Hand an intent back for a fresh dispatch after reconciliation proved
    /// the venue has no matching order. Only reaches hashes awaiting
    /// reconciliation; a retired hash stays suppressed.
    pub fn release(&self, intent_hash: u64) {
        self.in_flight.lock().remove(&intent_hash);
    }

    /// Permanently retire a hash: the order was sent (or settled), so this
    /// canonical intent must never dispatch again in this process.
    pub fn retire(&self, intent_hash: u64) {
        self.in_flight.lock().remove(&intent_hash);
        self.retired.lock().insert(intent_hash);
    }

    /// Fold reconciliation outcomes into the projection: venue-confirmed
    /// hashes retire, proven-absent hashes release, and any unresolved
    /// ambiguity latches the open-block until an operator clears it.
    pub fn absorb_reconciliation(&self, actions: &[ReconcileAction]) {
        for action in actions {
            match action {
                ReconcileAction::MarkedSent { intent_hash, .. } => self.retire(*intent_hash),
                ReconcileAction::Released { intent_hash } => self.release(*intent_hash),
                ReconcileAction::Ambiguous { intent_hash, .. } => {
                    warn!(
                        intent_hash = format_args!("{intent_hash:016x}"),
                        "reconciliation left an unresolved ambiguity"
                    );
                    self.latch_open_block(RejectReason::LabelMatchAmbiguous);
                }
            }
        }
    }

    /// Latch the open-block: no risk-increasing intent passes until an
    /// operator clears it. Used on WAL refusal and unresolved ambiguity.
    pub fn latch_open_block(&self, reason: RejectReason) {
        warn!(%reason, "open-block latched");
        *self.open_block.lock() = Some(reason);
    }

    pub fn clear_open_block(&self) {
        *self.open_block.lock() = None;
        info!("open-block cleared by operator");
    }

    #[must_use]
    pub fn open_block_latched(&self) -> bool {
        self.open_block.lock().is_some()
    }

    /// Run the full pipeline for one intent.
    pub fn submit(&self, intent: &RawIntent, ctx: &EvalContext<'_>) -> ExecutorResult<Outcome> {
        match self.evaluate(intent, ctx) {
            Ok(Evaluated::Prepared(prepared)) => self.record_and_dispatch(*prepared, ctx),
            Ok(Evaluated::Duplicate(hash)) => {
                metrics::INTENTS_DUPLICATE_TOTAL.inc();
                info!(
                    intent_hash = format_args!("{hash:016x}"),
                    "duplicate intent suppressed"
                );
                Ok(Outcome::Noop(NoopReason::AlreadyInFlight))
            }
            Err(reason) => {
                metrics::INTENT_REJECTS_TOTAL
                    .with_label_values(&[reason.as_label()])
                    .inc();
                warn!(
                    instrument_id = %intent.instrument_id,
                    class = %intent.class,
                    %reason,
                    "intent rejected"
                );
                Ok(Outcome::Rejected(reason))
            }
        }
    }

    /// Pure evaluation: no writes of any kind happen in here.
    fn evaluate(
        &self,
        intent: &RawIntent,
        ctx: &EvalContext<'_>,
    ) -> Result<Evaluated, RejectReason> {
        preflight(intent, ctx.book, &self.config)?;

        let cached = self
            .metadata
            .get(&intent.instrument_id, ctx.now_ms)
            .ok_or(RejectReason::InstrumentMetadataMissing)?;
        if cached.signal != RiskSignal::Healthy {
            metrics::METADATA_STALE_READS_TOTAL.inc();
        }
        let mut signal = ctx.risk_signal.combine(cached.signal);

        // Cancels carry no quantity of their own.
        let quantized = if intent.class == IntentClass::Cancel {
            ordx_core::QuantizedIntent {
                qty_q: Qty::ZERO,
                limit_price_q: Price::ZERO,
                qty_steps: 0,
                price_ticks: 0,
            }
        } else {
            quantize(
                &cached.meta,
                intent.side,
                intent.raw_qty,
                intent.raw_limit_price,
            )?
        };

        let hash = intent_hash(&IntentHashInput::from_quantized(
            &intent.instrument_id,
            intent.side,
            &quantized,
            &intent.group_id,
            intent.leg_idx,
        ));
        let label = encode_label(&self.strategy_id, &intent.group_id, intent.leg_idx, hash)?;

        if self.in_flight.lock().contains(&hash) {
            return Ok(Evaluated::Duplicate(hash));
        }
        if self.retired.lock().contains(&hash) {
            return Ok(Evaluated::Duplicate(hash));
        }

        let fee = evaluate_fee_staleness(
            ctx.fee_rate,
            ctx.now_ms,
            ctx.fee_cached_at_ms,
            &self.config.fee_staleness,
        );
        metrics::FEE_CACHE_AGE_SECONDS.set(fee.cache_age_s as i64);
        signal = signal.combine(fee.signal);

        // Dispatch authorization.
        if intent.class == IntentClass::Open {
            if let Some(reason) = self.open_block.lock().clone() {
                return Err(reason);
            }
        }
        match intent.class {
            IntentClass::Open if !signal.allows_open() => {
                return Err(RejectReason::DispatchBlocked(signal));
            }
            IntentClass::Close | IntentClass::Hedge if !signal.allows_close() => {
                return Err(RejectReason::DispatchBlocked(signal));
            }
            _ => {}
        }

        let verdict = liquidity_gate(
            intent.class,
            intent.side,
            quantized.qty_q,
            ctx.book,
            ctx.now_ms,
            &self.config,
        )?;

        // Net edge, then pricing, both Open-only. Without a model price the
        // snapshot mid stands in.
        let fair_price = ctx
            .fair_price
            .or_else(|| ctx.book.and_then(FairPriceSource::fair_price));
        let mut limit_price = quantized.limit_price_q;
        if intent.class == IntentClass::Open {
            let fee_cost = fair_price.map(|fair| fee.fee_rate_effective * fair.inner());
            let slippage_cost = match (verdict.slippage_bps, fair_price) {
                (Some(bps), Some(fair)) => Some(bps * fair.inner() / Decimal::from(10_000)),
                _ => None,
            };
            let inputs = NetEdgeInputs {
                gross_edge: ctx.gross_edge_per_unit,
                fee_cost,
                slippage_cost,
                min_edge: Some(self.config.min_edge),
            };
            net_edge_gate(intent.class, &inputs)?;

            if intent.time_in_force == TimeInForce::ImmediateOrCancel {
                // The gate passed, so all three inputs were present.
                if let (Some(fair), Some(gross), Some(fee_cost)) =
                    (fair_price, ctx.gross_edge_per_unit, fee_cost)
                {
                    let quote = price_ioc_limit(
                        intent.side,
                        &PricerInputs {
                            fair_price: fair,
                            gross_edge_per_unit: gross,
                            fee_per_unit: fee_cost,
                            min_edge_per_unit: self.config.min_edge,
                        },
                        cached.meta.tick_size,
                    )?;
                    // Never exceed the caller's quantized limit.
                    limit_price = match intent.side {
                        OrderSide::Buy => quote.limit_price.min(quantized.limit_price_q),
                        OrderSide::Sell => quote.limit_price.max(quantized.limit_price_q),
                    };
                }
            }
        }

        let record = WalRecord {
            intent_hash: hash,
            instrument_id: intent.instrument_id.clone(),
            side: intent.side,
            class: intent.class,
            qty_q: quantized.qty_q,
            limit_price_q: limit_price,
            qty_steps: quantized.qty_steps,
            price_ticks: quantized.price_ticks,
            group_id: intent.group_id.clone(),
            leg_idx: intent.leg_idx,
            label: label.clone(),
            state: LifecycleState::Created,
            created_ts_ms: ctx.now_ms,
            sent_ts_ms: None,
        };
        let order = DispatchOrder {
            intent_hash: hash,
            instrument_id: intent.instrument_id.clone(),
            side: intent.side,
            class: intent.class,
            qty: quantized.qty_q,
            limit_price,
            time_in_force: intent.time_in_force,
            post_only: intent.post_only,
            label,
        };
        Ok(Evaluated::Prepared(Box::new(Prepared { record, order })))
    }

    fn record_and_dispatch(
        &self,
        prepared: Prepared,
        ctx: &EvalContext<'_>,
    ) -> ExecutorResult<Outcome> {
        let Prepared { mut record, order } = prepared;

        match self.wal.record_before_dispatch(record.clone()) {
            Ok(()) => {}
            Err(LedgerError::QueueFull) | Err(LedgerError::BarrierTimeout(_)) => {
                // Durability unconfirmed: refuse, and stop opening until an
                // operator looks at the WAL.
                self.latch_open_block(RejectReason::WalEnqueueFailed);
                metrics::WAL_ENQUEUE_FAILURES_TOTAL.inc();
                metrics::INTENT_REJECTS_TOTAL
                    .with_label_values(&[RejectReason::WalEnqueueFailed.as_label()])
                    .inc();
                return Ok(Outcome::Rejected(RejectReason::WalEnqueueFailed));
            }
            Err(err) => return Err(err.into()),
        }
        metrics::WAL_QUEUE_DEPTH.set(self.wal.queue_depth() as i64);
        self.in_flight.lock().insert(record.intent_hash);

        if let Err(err) = self.dispatcher.dispatch(&order) {
            // The order was recorded but the venue call failed locally.
            // Record the failure; the hash stays in flight until
            // reconciliation proves the venue never saw it.
            record.state = LifecycleState::Failed;
            if let Err(wal_err) = self.wal.append(record) {
                error!(%wal_err, "failed to record dispatch failure");
            }
            return Err(ExecutorError::DispatchFailed(err));
        }

        record.state = LifecycleState::Sent;
        record.sent_ts_ms = Some(ctx.now_ms);
        if let Err(err) = self.wal.append(record.clone()) {
            // Dispatch already happened; this must not be reported as a
            // failure. Replay will find the unsent record and reconcile.
            warn!(%err, "sent-transition append failed after dispatch");
        }
        // The venue has the order; this hash is spent for good.
        self.retire(record.intent_hash);

        metrics::INTENTS_DISPATCHED_TOTAL
            .with_label_values(&[match record.class {
                IntentClass::Open => "open",
                IntentClass::Close => "close",
                IntentClass::Hedge => "hedge",
                IntentClass::Cancel => "cancel",
            }])
            .inc();
        info!(
            intent_hash = format_args!("{:016x}", record.intent_hash),
            instrument_id = %record.instrument_id,
            class = %record.class,
            qty = %record.qty_q,
            limit = %record.limit_price_q,
            "intent dispatched"
        );

        Ok(Outcome::Dispatched {
            intent_hash: record.intent_hash,
            label: record.label,
            qty: record.qty_q,
            limit_price: record.limit_price_q,
        })
    }
}
