//! Execution engine.
//!
//! The engine runs bytecode one instruction at a time, keeping a taint tag next to every stack
//! entry and memory byte. Nested calls run to completion in their own [`CallFrame`] before the
//! caller resumes.
//!
//! # Key Components
//!
//! - [`Interpreter`] - Fetch, decode and execute loop with taint-aware opcode handlers
//! - [`CallFrame`] / [`Message`] - Per-call execution state and top-level requests
//! - [`StepResult`], [`FrameStatus`], [`ExecutionResult`] - Results at each level
//! - [`EmulationError`] - Frame-fatal faults
//! - [`TraceWriter`] / [`TraceEvent`] - Opt-in execution traces
//! - [`BranchDistance`] - Operand distances recorded for tainted comparisons
//!
//! Overflow predicates and distance computations live in [`arithmetic`] as pure functions so
//! they can be tested without running code.

pub mod arithmetic;
pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod gas;
mod interpreter;
pub(crate) mod pointer;
pub(crate) mod result;
pub(crate) mod stats;
pub(crate) mod trace;

pub use arithmetic::BranchDistance;
pub use context::{CallFrame, CallKind, Message};
pub use error::EmulationError;
pub use gas::{GasMeter, DEFAULT_GAS_LIMIT};
pub use interpreter::Interpreter;
pub use pointer::ProgramCounter;
pub use result::{ExecutionResult, FrameOutcome, FrameStatus, StepResult};
pub use stats::{ExecutionStats, LimitExceeded};
pub use trace::{TraceEvent, TraceWriter};
