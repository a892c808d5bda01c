//! WAL record schema and line codec.
//!
//! One record per line, `key=value` pairs joined with `|`. Values are
//! %-escaped so delimiters and newlines in ids cannot corrupt the log.
//! The format is append-only and versioned; readers skip keys they do not
//! know but refuse records missing required fields.

use std::collections::HashMap;
use std::str::FromStr;

use ordx_core::{IntentClass, LifecycleState, OrderSide, Price, Qty};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

pub const WAL_SCHEMA_VERSION: u32 = 1;

/// One durable record of intent-to-act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub intent_hash: u64,
    pub instrument_id: String,
    pub side: OrderSide,
    pub class: IntentClass,
    pub qty_q: Qty,
    pub limit_price_q: Price,
    pub qty_steps: u64,
    pub price_ticks: u64,
    pub group_id: String,
    pub leg_idx: u32,
    pub label: String,
    pub state: LifecycleState,
    pub created_ts_ms: u64,
    /// Set once the dispatch call has been made. A replayed record with
    /// this set is never redispatched.
    pub sent_ts_ms: Option<u64>,
}

impl WalRecord {
    /// Minimum schema a record must satisfy before it is written or trusted.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.instrument_id.trim().is_empty() {
            return Err(LedgerError::Schema(
                "instrument_id must be non-empty".to_string(),
            ));
        }
        if self.group_id.trim().is_empty() {
            return Err(LedgerError::Schema(
                "group_id must be non-empty".to_string(),
            ));
        }
        if self.label.trim().is_empty() {
            return Err(LedgerError::Schema("label must be non-empty".to_string()));
        }
        if self.created_ts_ms == 0 {
            return Err(LedgerError::Schema(
                "created_ts_ms must be non-zero".to_string(),
            ));
        }
        if !self.qty_q.is_positive() && self.class != IntentClass::Cancel {
            return Err(LedgerError::Schema("qty_q must be positive".to_string()));
        }
        Ok(())
    }

    /// Whether this record still needs to be checked against the venue
    /// before the process may dispatch anything with the same hash. No sent
    /// timestamp means the dispatch was never confirmed; a local `Failed`
    /// without one means the venue call errored with an unknown outcome
    /// (the venue may still have received the order).
    #[must_use]
    pub fn needs_reconciliation(&self) -> bool {
        self.sent_ts_ms.is_none()
            && (!self.state.is_terminal() || self.state == LifecycleState::Failed)
    }

    pub fn to_line(&self) -> String {
        let mut line = format!(
            "v={}|intent_hash={:016x}|instrument_id={}|side={}|class={}|qty_q={}|limit_price_q={}|qty_steps={}|price_ticks={}|group_id={}|leg_idx={}|label={}|state={}|created_ts_ms={}",
            WAL_SCHEMA_VERSION,
            self.intent_hash,
            escape_field(&self.instrument_id),
            self.side,
            self.class,
            self.qty_q,
            self.limit_price_q,
            self.qty_steps,
            self.price_ticks,
            escape_field(&self.group_id),
            self.leg_idx,
            escape_field(&self.label),
            self.state,
            self.created_ts_ms,
        );
        if let Some(sent) = self.sent_ts_ms {
            line.push_str(&format!("|sent_ts_ms={sent}"));
        }
        line
    }

    pub fn from_line(line: &str) -> LedgerResult<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for part in line.split('|') {
            if part.trim().is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| LedgerError::Parse(format!("malformed field: {part}")))?;
            fields.insert(key, value);
        }

        let record = WalRecord {
            intent_hash: u64::from_str_radix(required(&fields, "intent_hash")?, 16)
                .map_err(|_| LedgerError::Parse("invalid intent_hash".to_string()))?,
            instrument_id: unescape_field(required(&fields, "instrument_id")?)?,
            side: parse_side(required(&fields, "side")?)?,
            class: parse_class(required(&fields, "class")?)?,
            qty_q: parse_decimal(required(&fields, "qty_q")?, "qty_q").map(Qty::new)?,
            limit_price_q: parse_decimal(required(&fields, "limit_price_q")?, "limit_price_q")
                .map(Price::new)?,
            qty_steps: parse_num(required(&fields, "qty_steps")?, "qty_steps")?,
            price_ticks: parse_num(required(&fields, "price_ticks")?, "price_ticks")?,
            group_id: unescape_field(required(&fields, "group_id")?)?,
            leg_idx: parse_num(required(&fields, "leg_idx")?, "leg_idx")?,
            label: unescape_field(required(&fields, "label")?)?,
            state: LifecycleState::from_str(required(&fields, "state")?)
                .map_err(LedgerError::Parse)?,
            created_ts_ms: parse_num(required(&fields, "created_ts_ms")?, "created_ts_ms")?,
            sent_ts_ms: match fields.get("sent_ts_ms") {
                Some(v) => Some(parse_num(v, "sent_ts_ms")?),
                None => None,
            },
        };
        record.validate()?;
        Ok(record)
    }
}

fn required<'a>(fields: &HashMap<&str, &'a str>, name: &str) -> LedgerResult<&'a str> {
    fields
        .get(name)
        .copied()
        .ok_or_else(|| LedgerError::Parse(format!("missing field: {name}")))
}

fn parse_side(s: &str) -> LedgerResult<OrderSide> {
    match s {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        other => Err(LedgerError::Parse(format!("invalid side: {other}"))),
    }
}

fn parse_class(s: &str) -> LedgerResult<IntentClass> {
    match s {
        "open" => Ok(IntentClass::Open),
        "close" => Ok(IntentClass::Close),
        "hedge" => Ok(IntentClass::Hedge),
        "cancel" => Ok(IntentClass::Cancel),
        other => Err(LedgerError::Parse(format!("invalid class: {other}"))),
    }
}

fn parse_decimal(s: &str, name: &str) -> LedgerResult<rust_decimal::Decimal> {
    s.parse()
        .map_err(|_| LedgerError::Parse(format!("invalid {name}")))
}

fn parse_num<T: FromStr>(s: &str, name: &str) -> LedgerResult<T> {
    s.parse()
        .map_err(|_| LedgerError::Parse(format!("invalid {name}")))
}

pub(crate) fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            '=' => out.push_str("%3D"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn unescape_field(value: &str) -> LedgerResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let code: String = chars.by_ref().take(2).collect();
        let decoded = match code.as_str() {
            "25" => '%',
            "7C" => '|',
            "3D" => '=',
            "0A" => '\n',
            "0D" => '\r',
            other => {
                return Err(LedgerError::Parse(format!("invalid escape: %{other}")));
            }
        };
        out.push(decoded);
    }
    Ok(out)
}
