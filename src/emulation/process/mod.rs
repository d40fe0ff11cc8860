//! Process model for taint analysis runs.
//!
//! This module provides the high-level interface for setting up and running analyses:
//! configuration, the world state seen by executing code, cooperative cancellation and the
//! [`EmulationProcess`] that ties them together.
//!
//! # Key Components
//!
//! - [`ProcessBuilder`] - Fluent API for configuring and creating processes
//! - [`EmulationProcess`] - Runs messages, alone or in parallel batches
//! - [`AnalysisConfig`] - Configuration with presets
//! - [`EmulationLimits`] - Resource and execution limits
//! - [`Host`] / [`InMemoryHost`] - Accounts, storage and block data
//! - [`AbortSignal`] - Cooperative cancellation shared between threads
//!
//! # Workflow
//!
//! 1. Populate a [`Host`] with the contracts under analysis
//! 2. Create a [`ProcessBuilder`], pick a preset and adjust limits
//! 3. Call [`build()`](ProcessBuilder::build) to create an [`EmulationProcess`]
//! 4. Run messages with [`execute()`](EmulationProcess::execute) or
//!    [`execute_batch()`](EmulationProcess::execute_batch)
//! 5. Read the findings from the [`AnalysisSession`](crate::emulation::AnalysisSession)
//!
//! # Configuration Presets
//!
//! - [`AnalysisConfig::analysis()`] - Single executions, every call data load tainted
//! - [`AnalysisConfig::fuzzing()`] - Bounded runs with an untainted selector load
//!
//! # See Also
//!
//! - [`crate::emulation::Interpreter`] - The execution engine driven by a process
//! - [`crate::emulation::AnalysisSession`] - Where findings are recorded

mod builder;
mod config;
mod execution;
mod host;
mod signal;

pub use builder::ProcessBuilder;
pub use config::{
    AnalysisConfig, CancellationGranularity, EmulationLimits, TracingConfig, MAX_CALL_DEPTH,
    SOLC_SELECTOR_LOAD_PC,
};
pub use execution::{EmulationProcess, ProcessSummary};
pub(crate) use host::hash_word;
pub use host::{Checkpoint, Environment, Host, InMemoryHost, Log};
pub use signal::AbortSignal;
