//! Step, frame and execution result types.
//!
//! This module defines the result types returned by the interpreter after executing a single
//! instruction, after a call frame terminates, and after a whole top-level run.

use std::fmt;

use alloy_primitives::Address;
use serde::Serialize;

use crate::emulation::{cell_bytes, cell_taint, Cell, EmulationError, TaintFlags};

/// Result of executing a single instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Continue execution at the next sequential instruction.
    Continue,

    /// Continue at a validated jump destination.
    Jump {
        /// Target byte offset.
        target: usize,
    },

    /// The frame terminated.
    Halt(FrameStatus),
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Continue => write!(f, "continue"),
            StepResult::Jump { target } => write!(f, "jump {target}"),
            StepResult::Halt(status) => write!(f, "halt ({status})"),
        }
    }
}

/// Why a call frame terminated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FrameStatus {
    /// `STOP`, or execution ran off the end of the code.
    Stopped,
    /// `RETURN`.
    Returned,
    /// `REVERT`; the caller observes a failed call and receives the output.
    Reverted,
    /// `SELFDESTRUCT`.
    SelfDestructed,
    /// The cooperative abort signal fired.
    Aborted,
    /// A frame-fatal fault.
    #[serde(serialize_with = "serialize_fault")]
    Faulted(EmulationError),
}

impl FrameStatus {
    /// Returns `true` if the frame completed without revert or fault.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            FrameStatus::Stopped | FrameStatus::Returned | FrameStatus::SelfDestructed
        )
    }

    /// Returns `true` for a revert.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        matches!(self, FrameStatus::Reverted)
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameStatus::Stopped => write!(f, "stopped"),
            FrameStatus::Returned => write!(f, "returned"),
            FrameStatus::Reverted => write!(f, "reverted"),
            FrameStatus::SelfDestructed => write!(f, "self-destructed"),
            FrameStatus::Aborted => write!(f, "aborted"),
            FrameStatus::Faulted(error) => write!(f, "faulted: {error}"),
        }
    }
}

fn serialize_fault<S>(error: &EmulationError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(error)
}

/// Terminal state of one call frame, handed back to the calling frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Why the frame terminated.
    pub status: FrameStatus,
    /// Returned (or reverted) bytes with their tags.
    pub output: Vec<Cell>,
    /// Gas left in the frame; zero after a fault.
    pub gas_left: u64,
}

impl FrameOutcome {
    /// Creates an outcome without output.
    #[must_use]
    pub fn empty(status: FrameStatus, gas_left: u64) -> Self {
        FrameOutcome {
            status,
            output: Vec::new(),
            gas_left,
        }
    }
}

/// Outcome of a top-level execution, as seen by the analysis driver.
///
/// Findings are not part of this result; they live in the
/// [`AnalysisSession`](crate::emulation::AnalysisSession) passed to the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Why the top-level frame terminated. Never [`FrameStatus::Faulted`]: top-level faults are
    /// returned as errors.
    pub status: FrameStatus,
    /// Returned or reverted bytes.
    pub output: Vec<u8>,
    /// OR of the tags of the output bytes.
    pub output_taint: TaintFlags,
    /// Gas consumed by the run.
    pub gas_used: u64,
    /// Instructions executed across all frames.
    pub instructions: u64,
    /// Address of the deployed contract for creation runs.
    pub created: Option<Address>,
}

impl ExecutionResult {
    pub(crate) fn from_outcome(
        outcome: FrameOutcome,
        gas_limit: u64,
        instructions: u64,
        created: Option<Address>,
    ) -> Self {
        ExecutionResult {
            output: cell_bytes(&outcome.output),
            output_taint: cell_taint(&outcome.output),
            gas_used: gas_limit.saturating_sub(outcome.gas_left),
            status: outcome.status,
            instructions,
            created,
        }
    }

    /// Returns `true` if the run completed without revert.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} instructions, {} gas, {} output bytes",
            self.status,
            self.instructions,
            self.gas_used,
            self.output.len()
        )
    }
}
