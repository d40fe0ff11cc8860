//! # taintscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! taintscope library. Import it to get quick access to everything needed to set up a world
//! state, run messages and read the findings.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all taintscope operations
pub use crate::Error;

/// The result type used throughout taintscope
pub use crate::Result;

/// 160-bit account address
pub use alloy_primitives::Address;

// ================================================================================================
// Bytecode
// ================================================================================================

/// Code, its jump destinations and the assembler
pub use crate::assembly::{Bytecode, BytecodeEncoder, Instruction};

/// Opcode byte constants
pub use crate::assembly::opcodes::*;

// ================================================================================================
// Values
// ================================================================================================

/// The machine word and its taint tag
pub use crate::emulation::{word, TaintFlags, Word};

// ================================================================================================
// Running Code
// ================================================================================================

/// Process model and configuration
pub use crate::emulation::{
    AbortSignal, AnalysisConfig, CancellationGranularity, EmulationLimits, EmulationProcess,
    ProcessBuilder, TracingConfig, SOLC_SELECTOR_LOAD_PC,
};

/// World state
pub use crate::emulation::{Environment, Host, InMemoryHost};

/// Messages and results
pub use crate::emulation::{
    EmulationError, ExecutionResult, FrameStatus, Interpreter, Message, DEFAULT_GAS_LIMIT,
};

// ================================================================================================
// Findings
// ================================================================================================

/// Per-run findings
pub use crate::emulation::{
    AggregationState, AnalysisSession, BranchCost, CostRecord, PathEntry, PathRecord,
    SessionReport,
};
