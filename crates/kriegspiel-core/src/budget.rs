//! Decision budgets

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Search ceiling for one move-selection call.
///
/// Every limit is an upper bound: the agent returns once any one of them is
/// reached, and may return earlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecisionBudget {
    /// Wall-clock ceiling in seconds; zero or infinity means no time limit
    pub max_seconds: f64,
    /// Iteration ceiling, `None` for unbounded
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Search depth ceiling, `None` for unbounded
    #[serde(default)]
    pub max_depth: Option<u32>,
}

impl DecisionBudget {
    /// Budget limited only by time
    pub fn seconds(max_seconds: f64) -> Self {
        Self {
            max_seconds,
            ..Default::default()
        }
    }

    pub fn with_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Reject budgets the native side cannot interpret
    pub fn validate(&self) -> Result<()> {
        if self.max_seconds.is_nan() || self.max_seconds < 0.0 {
            return Err(BridgeError::InvalidBudget(format!(
                "max_seconds must be non-negative, got {}",
                self.max_seconds
            )));
        }
        Ok(())
    }

    /// Wall-clock limit, if one applies.
    ///
    /// Values too large for a `Duration` are treated as no limit.
    pub fn time_limit(&self) -> Option<Duration> {
        if self.max_seconds > 0.0 {
            Duration::try_from_secs_f64(self.max_seconds).ok()
        } else {
            None
        }
    }
}

impl Default for DecisionBudget {
    fn default() -> Self {
        Self {
            max_seconds: 0.0,
            max_iterations: None,
            max_depth: None,
        }
    }
}
