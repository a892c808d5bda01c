//! Order execution: the chokepoint every dispatch passes through, plus the
//! pieces it is built from.
//!
//! - [`chokepoint`]: the single legal path from intent to venue.
//! - [`idempotency`] and [`label`]: deterministic intent identity and the
//!   venue label that carries it.
//! - [`pricer`]: bounded-aggression IOC limit pricing.
//! - [`tlsm`]: the total lifecycle state machine.
//! - [`fills`]: trade-id dedup ahead of any lifecycle update.
//! - [`reconcile`] and [`label_match`]: startup recovery against the
//!   venue's open orders.

pub mod chokepoint;
pub mod error;
pub mod fills;
pub mod idempotency;
pub mod label;
pub mod label_match;
pub mod pricer;
pub mod reconcile;
pub mod tlsm;

pub use chokepoint::{Chokepoint, DispatchOrder, Dispatcher, EvalContext, NoopReason, Outcome};
pub use error::{ExecutorError, ExecutorResult};
pub use fills::{apply_fill, FillEvent, FillOutcome};
pub use idempotency::{hash_hex, intent_hash, IntentHashInput};
pub use label::{decode_label, encode_label, LabelParts, LABEL_MAX_LEN, LABEL_PREFIX};
pub use label_match::{match_order, ExpectedOrder, MatchOutcome, VenueOrder};
pub use pricer::{price_ioc_limit, IocQuote, PricerInputs};
pub use reconcile::{reconcile, ReconcileAction, VenueOrders};
pub use tlsm::{LifecycleEvent, TrackedIntent, TransitionLedger};
