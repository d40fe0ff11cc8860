//! Analysis findings collected during a run.
//!
//! The interpreter reports three kinds of advisory data, all owned by an [`AnalysisSession`]:
//!
//! - [`AggregationState`] - OR of every taint and finding flag observed
//! - [`PathRecord`] - taken conditional jumps as `(pc, destination)` pairs
//! - [`CostRecord`] - branch distances of tainted comparisons feeding a `JUMPI`
//!
//! None of this influences execution: gas, control flow and the success of a run are the same
//! with or without a session attached.

mod aggregate;
mod cost;
mod path;
mod session;

pub use aggregate::AggregationState;
pub use cost::{BranchCost, CostEntry, CostRecord};
pub use path::{PathEntry, PathRecord};
pub use session::{AnalysisSession, SessionReport, DEFAULT_RECORDER_CAPACITY};
