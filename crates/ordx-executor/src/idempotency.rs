//! Deterministic intent hashing.
//!
//! The hash is the identity of an intent across restarts, so its inputs
//! are exactly the canonical tuple and nothing else. Wall-clock time never
//! enters: the same strategy decision on the same quantized values hashes
//! identically no matter when it is made.

use ordx_core::{OrderSide, QuantizedIntent};
use sha2::{Digest, Sha256};

/// Canonical tuple that identifies an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentHashInput<'a> {
    pub instrument_id: &'a str,
    pub side: OrderSide,
    pub qty_steps: u64,
    pub price_ticks: u64,
    pub group_id: &'a str,
    pub leg_idx: u32,
}

impl<'a> IntentHashInput<'a> {
    pub fn from_quantized(
        instrument_id: &'a str,
        side: OrderSide,
        quantized: &QuantizedIntent,
        group_id: &'a str,
        leg_idx: u32,
    ) -> Self {
        Self {
            instrument_id,
            side,
            qty_steps: quantized.qty_steps,
            price_ticks: quantized.price_ticks,
            group_id,
            leg_idx,
        }
    }
}

/// SHA-256 over the canonical tuple, truncated to 64 bits.
///
/// Fields are length-prefixed so no concatenation of ids can collide with
/// a different split of the same bytes.
#[must_use]
pub fn intent_hash(input: &IntentHashInput<'_>) -> u64 {
    let mut hasher = Sha256::new();
    hash_str(&mut hasher, input.instrument_id);
    hasher.update([match input.side {
        OrderSide::Buy => 0u8,
        OrderSide::Sell => 1u8,
    }]);
    hasher.update(input.qty_steps.to_be_bytes());
    hasher.update(input.price_ticks.to_be_bytes());
    hash_str(&mut hasher, input.group_id);
    hasher.update(input.leg_idx.to_be_bytes());

    let digest = hasher.finalize();
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(first)
}

/// Hex rendering used in labels and ledger lines.
#[must_use]
pub fn hash_hex(hash: u64) -> String {
    hex::encode(hash.to_be_bytes())
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> IntentHashInput<'static> {
        IntentHashInput {
            instrument_id: "BTC-PERPETUAL",
            side: OrderSide::Buy,
            qty_steps: 1,
            price_ticks: 200,
            group_id: "grp-1",
            leg_idx: 0,
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(intent_hash(&input()), intent_hash(&input()));
    }

    #[test]
    fn test_every_field_matters() {
        let base = intent_hash(&input());

        let mut i = input();
        i.instrument_id = "ETH-PERPETUAL";
        assert_ne!(intent_hash(&i), base);

        let mut i = input();
        i.side = OrderSide::Sell;
        assert_ne!(intent_hash(&i), base);

        let mut i = input();
        i.qty_steps = 2;
        assert_ne!(intent_hash(&i), base);

        let mut i = input();
        i.price_ticks = 201;
        assert_ne!(intent_hash(&i), base);

        let mut i = input();
        i.group_id = "grp-2";
        assert_ne!(intent_hash(&i), base);

        let mut i = input();
        i.leg_idx = 1;
        assert_ne!(intent_hash(&i), base);
    }

    #[test]
    fn test_no_concatenation_collision() {
        let a = IntentHashInput {
            instrument_id: "AB",
            group_id: "C",
            ..input()
        };
        let b = IntentHashInput {
            instrument_id: "A",
            group_id: "BC",
            ..input()
        };
        assert_ne!(intent_hash(&a), intent_hash(&b));
    }

    #[test]
    fn test_hash_hex_is_16_chars() {
        let h = hash_hex(intent_hash(&input()));
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
