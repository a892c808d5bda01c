//! Wall-clock capture at the process edge.
//!
//! Everything downstream takes `now_ms` as an argument so staleness logic
//! stays deterministic under test; this is the one place a clock is read.

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_past_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
