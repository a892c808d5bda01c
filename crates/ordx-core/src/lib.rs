//! Core domain types for the deterministic order execution core.
//!
//! This crate provides the fundamental types used throughout the pipeline:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `InstrumentMetadata`: quantization parameters with a TTL cache
//! - `RawIntent`, `QuantizedIntent`: intents before and after quantization
//! - `RejectReason`: the closed taxonomy of refusals
//! - `RiskSignal`: the coarse health signal gating dispatch

pub mod book;
pub mod clock;
pub mod decimal;
pub mod error;
pub mod instrument;
pub mod intent;
pub mod lifecycle;
pub mod quantize;
pub mod reject;
pub mod risk;

pub use book::{L2Level, L2Snapshot};
pub use clock::now_ms;
pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use instrument::{CachedMetadata, InstrumentKind, InstrumentMetadata, MetadataCache};
pub use intent::{
    IntentAction, IntentClass, LinkedOrderType, OrderSide, OrderType, QuantizedIntent, RawIntent,
    TimeInForce,
};
pub use lifecycle::LifecycleState;
pub use quantize::quantize;
pub use reject::RejectReason;
pub use risk::{RiskSignal, TradingMode};
