//! Order lifecycle states.
//!
//! The transition function lives with the executor; the states themselves
//! are domain model, shared with the ledger which persists them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an order is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Sent,
    Acked,
    PartiallyFilled,
    Filled,
    Canceled,
    Failed,
}

impl LifecycleState {
    /// Terminal states absorb all further events.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::Filled | LifecycleState::Canceled | LifecycleState::Failed
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Sent => "sent",
            LifecycleState::Acked => "acked",
            LifecycleState::PartiallyFilled => "partially_filled",
            LifecycleState::Filled => "filled",
            LifecycleState::Canceled => "canceled",
            LifecycleState::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(LifecycleState::Created),
            "sent" => Ok(LifecycleState::Sent),
            "acked" => Ok(LifecycleState::Acked),
            "partially_filled" => Ok(LifecycleState::PartiallyFilled),
            "filled" => Ok(LifecycleState::Filled),
            "canceled" => Ok(LifecycleState::Canceled),
            "failed" => Ok(LifecycleState::Failed),
            other => Err(format!("unknown lifecycle state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(LifecycleState::Filled.is_terminal());
        assert!(LifecycleState::Canceled.is_terminal());
        assert!(LifecycleState::Failed.is_terminal());
        assert!(!LifecycleState::PartiallyFilled.is_terminal());
        assert!(!LifecycleState::Created.is_terminal());
    }

    #[test]
    fn test_round_trip() {
        for state in [
            LifecycleState::Created,
            LifecycleState::Sent,
            LifecycleState::Acked,
            LifecycleState::PartiallyFilled,
            LifecycleState::Filled,
            LifecycleState::Canceled,
            LifecycleState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<LifecycleState>(), Ok(state));
        }
    }
}
