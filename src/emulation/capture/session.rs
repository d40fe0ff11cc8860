//! Per-run analysis state.

use serde::Serialize;

use crate::{
    emulation::{
        capture::{AggregationState, CostRecord, PathRecord},
        engine::arithmetic::BranchDistance,
        TaintFlags,
    },
    Result,
};

/// Default advisory capacity of the path and cost recorders.
pub const DEFAULT_RECORDER_CAPACITY: usize = 1024;

/// Findings of one analysis run.
///
/// A session is created by the caller, passed by mutable reference into
/// [`EmulationProcess::execute`](crate::emulation::EmulationProcess::execute), and read after the
/// run returns. Nothing in it is shared between runs, so independent runs on different threads
/// each use their own session. Call [`AnalysisSession::reset`] to reuse one for an unrelated run.
///
/// # Examples
///
/// ```rust
/// use taintscope::emulation::{AnalysisSession, TaintFlags};
///
/// let session = AnalysisSession::new();
/// assert!(session.flags().is_safe());
/// assert!(session.path().is_empty());
/// assert!(session.cost().is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSession {
    aggregate: AggregationState,
    path: PathRecord,
    cost: CostRecord,
}

/// Compact summary of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Accumulated flags.
    pub flags: TaintFlags,
    /// Whether any unguarded externally driven overflow was seen.
    pub unprotected_overflow: bool,
    /// Whether any guarded externally driven overflow was seen.
    pub protected_overflow: bool,
    /// Number of taken conditional jumps.
    pub jumps_taken: usize,
    /// Number of tainted comparisons that fed a conditional jump.
    pub tainted_branches: usize,
}

impl AnalysisSession {
    /// Creates a session with the default recorder capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECORDER_CAPACITY)
    }

    /// Creates a session whose recorders pre-allocate `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        AnalysisSession {
            aggregate: AggregationState::new(),
            path: PathRecord::with_capacity(capacity),
            cost: CostRecord::with_capacity(capacity),
        }
    }

    /// The run-wide aggregation state.
    #[must_use]
    pub fn aggregate(&self) -> &AggregationState {
        &self.aggregate
    }

    /// Shorthand for `aggregate().flags()`.
    #[must_use]
    pub fn flags(&self) -> TaintFlags {
        self.aggregate.flags()
    }

    /// Taken conditional jumps.
    #[must_use]
    pub fn path(&self) -> &PathRecord {
        &self.path
    }

    /// Branch distances.
    #[must_use]
    pub fn cost(&self) -> &CostRecord {
        &self.cost
    }

    pub(crate) fn record_flags(&mut self, flags: TaintFlags) {
        self.aggregate.merge(flags);
    }

    pub(crate) fn record_jump(&mut self, source: usize, destination: usize) {
        self.path.push(source, destination);
    }

    pub(crate) fn record_branch(&mut self, pc: usize, distance: BranchDistance) {
        self.cost.push(pc, distance);
    }

    /// Clears every finding, keeping allocated capacity.
    pub fn reset(&mut self) {
        self.aggregate.clear();
        self.path.clear();
        self.cost.clear();
    }

    /// Summarizes the session.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        let flags = self.flags();
        SessionReport {
            flags,
            unprotected_overflow: flags.contains(TaintFlags::OVERFLOW),
            protected_overflow: flags.contains(TaintFlags::PROTECTED_OVERFLOW),
            jumps_taken: self.path.len(),
            tainted_branches: self.cost.len() / 2,
        }
    }

    /// Renders the whole session as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
