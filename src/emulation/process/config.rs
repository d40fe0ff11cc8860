//! Analysis configuration types.
//!
//! This module provides the configuration of an analysis run: execution limits, cooperative
//! cancellation granularity, taint source tweaks and tracing options.
//!
//! # Overview
//!
//! - [`AnalysisConfig`] - Top-level configuration container
//! - [`EmulationLimits`] - Execution limits (instructions, call depth, memory, time)
//! - [`CancellationGranularity`] - Where the abort signal is polled
//! - [`TracingConfig`] - Instruction-level tracing options
//!
//! # Configuration Presets
//!
//! - [`AnalysisConfig::analysis()`] - Plain taint analysis of a single execution (the default)
//! - [`AnalysisConfig::fuzzing()`] - Many short executions driven by a fuzzer
//!
//! # Example
//!
//! ```rust
//! use taintscope::emulation::{AnalysisConfig, EmulationLimits};
//!
//! // Use a preset
//! let config = AnalysisConfig::fuzzing();
//!
//! // Or customize
//! let config = AnalysisConfig {
//!     limits: EmulationLimits::new()
//!         .with_max_instructions(1_000_000)
//!         .with_timeout_ms(5_000),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use crate::{emulation::capture::DEFAULT_RECORDER_CAPACITY, Error, Result};

/// Maximum nesting depth of call frames in the virtual machine.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Offset of the function-selector `CALLDATALOAD` in the standard solc dispatcher
/// (`PUSH1 0x80 PUSH1 0x40 MSTORE ... PUSH1 0x00 CALLDATALOAD`).
pub const SOLC_SELECTOR_LOAD_PC: usize = 14;

/// Configuration of an analysis run.
///
/// # Default Configuration
///
/// The default is [`AnalysisConfig::analysis()`]:
/// - no instruction or time limit
/// - call depth 1024, 32 MiB memory per frame
/// - abort signal polled at jumps
/// - every `CALLDATALOAD` tainted
/// - tracing disabled
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Execution limits controlling resource usage.
    pub limits: EmulationLimits,

    /// Where the cooperative abort signal is checked.
    pub cancellation: CancellationGranularity,

    /// Offset of a `CALLDATALOAD` whose result is not tainted.
    ///
    /// Loading the function selector taints every dispatcher comparison, which floods the
    /// cost record with branches that only select the entry point. Setting this to the offset of
    /// the selector load pushes that one word as `SAFE`.
    pub selector_load_pc: Option<usize>,

    /// Advisory pre-allocation of the path and cost recorders of sessions created by the
    /// process (batch runs).
    pub recorder_capacity: usize,

    /// Tracing configuration.
    pub tracing: TracingConfig,
}

/// Limits for emulation execution.
///
/// `EmulationLimits` provides safety boundaries to prevent runaway execution. Instruction and
/// time limits abort the whole run with an error; the call depth and memory limits are
/// virtual machine faults that only fail the frame that hit them.
///
/// # Builder Pattern
///
/// ```rust
/// use taintscope::emulation::EmulationLimits;
///
/// let limits = EmulationLimits::new()
///     .with_max_instructions(5_000_000)
///     .with_max_call_depth(100)
///     .with_timeout_ms(30_000);
/// assert_eq!(limits.max_call_depth, 100);
/// ```
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_instructions` | 0 (unlimited) |
/// | `max_call_depth` | 1024 |
/// | `max_memory_bytes` | 32 MiB |
/// | `timeout_ms` | 0 (unlimited) |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulationLimits {
    /// Maximum instructions to execute across all frames. 0 means unlimited.
    pub max_instructions: u64,

    /// Maximum nesting depth of call frames.
    pub max_call_depth: usize,

    /// Maximum memory size of a single frame, in bytes.
    pub max_memory_bytes: usize,

    /// Wall-clock timeout in milliseconds. 0 means unlimited.
    pub timeout_ms: u64,
}

/// Where the cooperative abort signal is polled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancellationGranularity {
    /// At `JUMP` and `JUMPI` only. Every loop passes a jump, so a looping run still stops.
    #[default]
    Jumps,
    /// Before every instruction.
    EveryInstruction,
}

/// Tracing configuration.
///
/// Tracing is independent of the `tracing` crate diagnostics: it records a replayable
/// execution trace through a [`TraceWriter`](crate::emulation::TraceWriter).
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Record every executed instruction.
    ///
    /// Very high overhead but shows the stack depth and top-of-stack taint at each step.
    pub trace_instructions: bool,

    /// Record nested frame entry and exit.
    pub trace_calls: bool,

    /// Record taken jumps, overflow findings and branch costs.
    pub trace_findings: bool,

    /// Maximum trace entries to keep in memory.
    ///
    /// Set to 0 for unlimited. When exceeded, oldest entries are discarded. Ignored when
    /// `output_path` is set.
    pub max_trace_entries: usize,

    /// Output file path for trace events.
    ///
    /// When set, events are appended to this file as they occur, one JSON object per line.
    pub output_path: Option<PathBuf>,

    /// Context prefix included in every event as a `"context"` field.
    pub context_prefix: Option<String>,
}

impl TracingConfig {
    /// Creates a tracing configuration that logs everything to a file.
    ///
    /// # Arguments
    ///
    /// * `path` - File path to append trace events to
    #[must_use]
    pub fn full_trace<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            trace_instructions: true,
            trace_calls: true,
            trace_findings: true,
            max_trace_entries: 0,
            output_path: Some(path.into()),
            context_prefix: None,
        }
    }

    /// Creates a tracing configuration that keeps findings and calls in memory.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Ring buffer size, 0 for unlimited
    #[must_use]
    pub fn findings_in_memory(max_entries: usize) -> Self {
        Self {
            trace_instructions: false,
            trace_calls: true,
            trace_findings: true,
            max_trace_entries: max_entries,
            output_path: None,
            context_prefix: None,
        }
    }

    /// Sets the context prefix for trace events.
    #[must_use]
    pub fn with_context(mut self, prefix: impl Into<String>) -> Self {
        self.context_prefix = Some(prefix.into());
        self
    }

    /// Checks if any tracing is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.trace_instructions || self.trace_calls || self.trace_findings
    }

    /// Checks if file-based tracing is configured.
    #[must_use]
    pub fn has_output_file(&self) -> bool {
        self.output_path.is_some()
    }
}

impl Default for TracingConfig {
    /// Tracing is disabled by default.
    fn default() -> Self {
        Self {
            trace_instructions: false,
            trace_calls: false,
            trace_findings: false,
            max_trace_entries: 10_000,
            output_path: None,
            context_prefix: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::analysis()
    }
}

impl Default for EmulationLimits {
    fn default() -> Self {
        Self {
            max_instructions: 0,
            max_call_depth: MAX_CALL_DEPTH,
            max_memory_bytes: 32 * 1024 * 1024,
            timeout_ms: 0,
        }
    }
}

/// Preset configurations for common use cases.
impl AnalysisConfig {
    /// Creates a configuration for analysing a single execution.
    ///
    /// Runs unbounded (gas is the only limit), taints every call data load and polls the abort
    /// signal at jumps.
    #[must_use]
    pub fn analysis() -> Self {
        Self {
            limits: EmulationLimits::default(),
            cancellation: CancellationGranularity::Jumps,
            selector_load_pc: None,
            recorder_capacity: DEFAULT_RECORDER_CAPACITY,
            tracing: TracingConfig::default(),
        }
    }

    /// Creates a configuration for fuzzing campaigns.
    ///
    /// Caps each run at one million instructions and one second, polls the abort signal before
    /// every instruction, and leaves the solc selector load untainted so the cost record only
    /// holds branches that depend on arguments.
    #[must_use]
    pub fn fuzzing() -> Self {
        Self {
            limits: EmulationLimits::new()
                .with_max_instructions(1_000_000)
                .with_timeout_ms(1_000),
            cancellation: CancellationGranularity::EveryInstruction,
            selector_load_pc: Some(SOLC_SELECTOR_LOAD_PC),
            recorder_capacity: 256,
            tracing: TracingConfig::default(),
        }
    }

    /// Checks the configuration for values the virtual machine cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the call depth exceeds the machine limit of 1024 or the
    /// memory limit is smaller than one word.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_call_depth > MAX_CALL_DEPTH {
            return Err(Error::Configuration(format!(
                "max_call_depth {} exceeds the machine limit of {MAX_CALL_DEPTH}",
                self.limits.max_call_depth
            )));
        }
        if self.limits.max_memory_bytes < 32 {
            return Err(Error::Configuration(format!(
                "max_memory_bytes {} is smaller than one word",
                self.limits.max_memory_bytes
            )));
        }
        Ok(())
    }
}

impl EmulationLimits {
    /// Creates limits with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum instruction count (0 for unlimited).
    #[must_use]
    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the maximum memory size of a frame.
    #[must_use]
    pub fn with_max_memory_bytes(mut self, max: usize) -> Self {
        self.max_memory_bytes = max;
        self
    }

    /// Sets the timeout in milliseconds (0 for unlimited).
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}
