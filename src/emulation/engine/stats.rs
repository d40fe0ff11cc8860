//! Run counters and the instruction and wall-clock budgets.
//!
//! One [`ExecutionStats`] lives for a whole run and is shared by every frame of the call tree,
//! so the budgets in [`EmulationLimits`] bound the run as a whole. Call depth is not a budget
//! here; it is a property of the frame being created and is checked when a call is entered.

use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::emulation::{process::EmulationLimits, EmulationError};

/// Counters for one run across all of its frames.
#[derive(Clone, Debug, Default)]
pub struct ExecutionStats {
    /// Instructions dispatched, including the one that halted each frame.
    pub instructions_executed: u64,

    /// Frames entered, the top-level frame included.
    pub frames_entered: u64,

    /// Deepest frame reached; the top-level frame is depth 0.
    pub max_depth: usize,

    started: Option<Instant>,
}

impl ExecutionStats {
    /// Creates zeroed counters with the clock not yet running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the wall clock for the timeout budget.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Counts one dispatched instruction.
    pub fn increment_instructions(&mut self) {
        self.instructions_executed += 1;
    }

    /// Counts a frame entered at `depth`.
    pub fn enter_depth(&mut self, depth: usize) {
        self.frames_entered += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Wall time since [`start`](Self::start), `None` before the run started.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|started| started.elapsed())
    }

    /// Returns the first exhausted budget, if any. A budget of zero is unlimited.
    #[must_use]
    pub fn check_limits(&self, limits: &EmulationLimits) -> Option<LimitExceeded> {
        let max = limits.max_instructions;
        if max != 0 && self.instructions_executed >= max {
            return Some(LimitExceeded::Instructions {
                executed: self.instructions_executed,
                limit: max,
            });
        }

        if limits.timeout_ms == 0 {
            return None;
        }
        let budget = Duration::from_millis(limits.timeout_ms);
        match self.elapsed() {
            Some(elapsed) if elapsed >= budget => Some(LimitExceeded::Timeout {
                elapsed,
                limit: budget,
            }),
            _ => None,
        }
    }

    /// Zeroes the counters and stops the clock.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An exhausted run budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LimitExceeded {
    /// `max_instructions` reached.
    Instructions {
        /// Instructions dispatched so far.
        executed: u64,
        /// Configured budget.
        limit: u64,
    },

    /// `timeout_ms` reached.
    Timeout {
        /// Wall time spent.
        elapsed: Duration,
        /// Configured budget.
        limit: Duration,
    },
}

impl From<LimitExceeded> for EmulationError {
    fn from(exceeded: LimitExceeded) -> Self {
        match exceeded {
            LimitExceeded::Instructions { executed, limit } => {
                EmulationError::InstructionLimitExceeded { executed, limit }
            }
            LimitExceeded::Timeout { elapsed, limit } => EmulationError::Timeout { elapsed, limit },
        }
    }
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitExceeded::Instructions { executed, limit } => {
                write!(f, "{executed} instructions run, budget {limit}")
            }
            LimitExceeded::Timeout { elapsed, limit } => {
                write!(f, "ran for {elapsed:?}, budget {limit:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_counters() {
        let stats = ExecutionStats::new();
        assert_eq!(stats.instructions_executed, 0);
        assert_eq!(stats.frames_entered, 0);
        assert!(stats.elapsed().is_none());
    }

    #[test]
    fn default_limits_never_trip() {
        let mut stats = ExecutionStats::new();
        stats.start();
        for _ in 0..10_000 {
            stats.increment_instructions();
        }
        assert!(stats.check_limits(&EmulationLimits::default()).is_none());
    }

    #[test]
    fn instruction_budget() {
        let mut stats = ExecutionStats::new();
        let limits = EmulationLimits::new().with_max_instructions(2);

        stats.increment_instructions();
        assert!(stats.check_limits(&limits).is_none());
        stats.increment_instructions();

        assert_eq!(
            stats.check_limits(&limits),
            Some(LimitExceeded::Instructions {
                executed: 2,
                limit: 2
            })
        );
    }

    #[test]
    fn timeout_needs_running_clock() {
        let stats = ExecutionStats::new();
        let limits = EmulationLimits::new().with_timeout_ms(1);
        assert!(stats.check_limits(&limits).is_none());
    }

    #[test]
    fn depth_tracking_and_reset() {
        let mut stats = ExecutionStats::new();
        stats.start();
        stats.enter_depth(0);
        stats.enter_depth(3);
        stats.enter_depth(1);
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.frames_entered, 3);

        stats.reset();
        assert_eq!(stats.max_depth, 0);
        assert!(stats.elapsed().is_none());
    }

    #[test]
    fn limit_maps_to_fault() {
        let error = EmulationError::from(LimitExceeded::Instructions {
            executed: 9,
            limit: 9,
        });
        assert!(error.is_execution_limit());
    }
}
