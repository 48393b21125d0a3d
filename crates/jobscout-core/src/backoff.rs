//! Skip-cycle backoff for oracles that fail to crawl.
//!
//! ```text
//! crawl ok      --> failures = 0, skip = 0
//! crawl failed  --> failures + 1, skip = min(skip + 2^failures, cap)
//! skip > 0      --> not crawled this cycle, skip - 1
//! ```
//!
//! The exponent uses the failure count from *before* the failed attempt, so
//! the first failure costs one cycle, the second two, the third four.

use crate::models::OracleRecord;

/// Backoff fields of an [`OracleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackoffState {
    pub consecutive_failures: u32,
    pub skip_cycles_remaining: u32,
}

impl BackoffState {
    pub fn new(consecutive_failures: u32, skip_cycles_remaining: u32) -> Self {
        Self {
            consecutive_failures,
            skip_cycles_remaining,
        }
    }

    pub fn of(record: &OracleRecord) -> Self {
        Self::new(record.consecutive_failures, record.skip_cycles_remaining)
    }

    pub fn apply_to(self, record: &mut OracleRecord) {
        record.consecutive_failures = self.consecutive_failures;
        record.skip_cycles_remaining = self.skip_cycles_remaining;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_skip_cycles: u32,
}

impl BackoffPolicy {
    pub fn new(max_skip_cycles: u32) -> Self {
        Self { max_skip_cycles }
    }

    pub fn on_failure(&self, state: BackoffState) -> BackoffState {
        let penalty = 1u32
            .checked_shl(state.consecutive_failures)
            .unwrap_or(u32::MAX);
        BackoffState {
            consecutive_failures: state.consecutive_failures.saturating_add(1),
            skip_cycles_remaining: state
                .skip_cycles_remaining
                .saturating_add(penalty)
                .min(self.max_skip_cycles),
        }
    }

    pub fn on_success(&self, _state: BackoffState) -> BackoffState {
        BackoffState::default()
    }

    /// Transition for a cycle in which the oracle was not crawled.
    pub fn on_skip(&self, state: BackoffState) -> BackoffState {
        BackoffState {
            consecutive_failures: state.consecutive_failures,
            skip_cycles_remaining: state.skip_cycles_remaining.saturating_sub(1),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(32)
    }
}
