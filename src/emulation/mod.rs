//! Taint-tracking EVM emulation.
//!
//! This module executes EVM bytecode while tracking which values are derived from
//! attacker-controlled input. Every stack entry and memory byte carries a [`TaintFlags`] tag;
//! the interpreter propagates tags through every instruction and reports three kinds of
//! findings along the way:
//!
//! - Overflow: externally driven `ADD`, `SUB`, `MUL` or `ADDMOD` that wraps around, classified as
//!   guarded or unguarded by the [`guard`] scanner
//! - Branch cost: how far the operands of a tainted comparison feeding a `JUMPI` are from
//!   flipping it, the distance feedback a fuzzer minimizes
//! - Path: the conditional jumps that were taken
//!
//! # Architecture
//!
//! The module is organized into several sub-modules:
//!
//! - Runtime value representation: the 256-bit [`Word`] and its tag
//! - Memory model: the operand stack and linear memory, each pairing values with tags
//! - Execution engine: interpreter, call frames, gas, traces
//! - Guard scanner: fixed-offset templates for compiler-emitted overflow checks
//! - Capture: the per-run [`AnalysisSession`] holding all findings
//! - Process model: configuration, world state and the [`EmulationProcess`] entry point
//!
//! # Key Components
//!
//! ## Process Model
//! - [`EmulationProcess`] - Runs messages against a shared world state
//! - [`ProcessBuilder`] - Fluent API for configuring processes
//! - [`AnalysisConfig`] - Configuration with presets
//! - [`Host`] / [`InMemoryHost`] - Accounts, storage and block data
//!
//! ## Execution Engine
//! - [`Interpreter`] - Core instruction interpreter
//! - [`Message`] - A top-level call or creation request
//! - [`ExecutionResult`] - Outcome of a top-level run
//!
//! ## Findings
//! - [`AnalysisSession`] - Aggregated flags, path record and cost record of a run
//! - [`CostRecord`] / [`PathRecord`] - The recorders themselves
//!
//! # Usage Examples
//!
//! ```rust
//! use taintscope::assembly::{opcodes::*, BytecodeEncoder};
//! use taintscope::emulation::{AnalysisSession, Message, ProcessBuilder, Word, InMemoryHost};
//! use alloy_primitives::Address;
//! use std::sync::Arc;
//!
//! // if (input < 10) jump
//! let mut code = BytecodeEncoder::new();
//! code.push_u64(10)
//!     .push_u64(0)
//!     .emit(CALLDATALOAD)
//!     .emit(LT)
//!     .jumpi("small")
//!     .emit(STOP)
//!     .label("small")
//!     .emit(STOP);
//!
//! let target = Address::repeat_byte(0xCC);
//! let host = Arc::new(InMemoryHost::new());
//! host.insert_account(target, Word::ZERO, code.finalize()?);
//! let process = ProcessBuilder::new().host(host).build()?;
//!
//! let input = Word::from(25u64).to_be_bytes::<32>().to_vec();
//! let (_, session) = process.analyze(&Message::call(Address::ZERO, target).with_input(input))?;
//!
//! // 25 < 10 is false; the comparison flips once the input drops by 16
//! let branch = session.cost().branches().next().unwrap();
//! assert_eq!(branch.if_false, Word::ZERO);
//! assert_eq!(branch.if_true, Word::from(16u64));
//! assert!(session.path().is_empty());
//! # Ok::<(), taintscope::Error>(())
//! ```
//!
//! # Execution Limits
//!
//! Gas bounds every run. On top of that the analysis enforces:
//!
//! - **Instruction limit**: Maximum instructions across all frames
//! - **Call depth limit**: Maximum nesting of call frames
//! - **Memory limit**: Maximum memory of a single frame
//! - **Timeout**: Wall-clock time limit
//!
//! Instruction and time limits abort the whole run; the others are faults of the frame that hit
//! them, which its caller observes as a failed call.
//!
//! # Thread Safety
//!
//! An [`Interpreter`] and its frames are single-threaded. [`EmulationProcess`] is `Send + Sync`
//! and runs independent messages in parallel, each with its own session.

mod capture;
mod engine;
pub mod guard;
mod memory;
mod process;
mod value;

// Re-export primary types from value module
pub use value::{word, TaintFlags, Word};

// Re-export primary types from memory module
pub use memory::{cell_bytes, cell_taint, Cell, Slot, TaintedMemory, TaintedStack, STACK_LIMIT};

// Re-export primary types from engine module
pub use engine::{
    arithmetic, BranchDistance, CallFrame, CallKind, EmulationError, ExecutionResult,
    ExecutionStats, FrameOutcome, FrameStatus, GasMeter, Interpreter, LimitExceeded, Message,
    ProgramCounter, StepResult, TraceEvent, TraceWriter, DEFAULT_GAS_LIMIT,
};

// Re-export primary types from capture module
pub use capture::{
    AggregationState, AnalysisSession, BranchCost, CostEntry, CostRecord, PathEntry, PathRecord,
    SessionReport, DEFAULT_RECORDER_CAPACITY,
};

// Re-export primary types from process module
pub use process::{
    AbortSignal, AnalysisConfig, CancellationGranularity, Checkpoint, EmulationLimits,
    EmulationProcess, Environment, Host, InMemoryHost, Log, ProcessBuilder, ProcessSummary,
    TracingConfig, MAX_CALL_DEPTH, SOLC_SELECTOR_LOAD_PC,
};
