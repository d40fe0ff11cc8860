//! Emulation error types.
//!
//! This module defines the frame-fatal faults that can occur while executing EVM bytecode.
//! A fault terminates the frame that raised it; the calling frame observes a failed call and
//! continues, while a fault in the top-level frame surfaces to the caller of
//! [`EmulationProcess::execute`](crate::emulation::EmulationProcess::execute).

use std::{fmt, time::Duration};

use crate::assembly::opcodes;

/// Faults that can occur during EVM emulation.
///
/// This enum covers all failure modes of bytecode execution, from stack underflows to
/// exhausted gas. Taint analysis never produces one of these: findings are advisory and do not
/// alter execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulationError {
    /// Stack grew past 1024 entries.
    StackOverflow,
    /// Pop or peek below the bottom of the stack.
    StackUnderflow,
    /// Undefined opcode or the designated `INVALID` instruction.
    InvalidOpcode {
        /// The opcode byte.
        opcode: u8,
        /// Offset of the opcode.
        pc: usize,
    },
    /// Jump to an offset that is not a `JUMPDEST`.
    InvalidJump {
        /// Offset of the jump instruction.
        pc: usize,
        /// Requested destination, saturated to `usize`.
        target: usize,
    },
    /// Not enough gas for the next charge.
    OutOfGas {
        /// Gas requested by the failing charge.
        required: u64,
        /// Gas that was left.
        remaining: u64,
    },
    /// State modification inside a read-only (`STATICCALL`) context.
    WriteProtection {
        /// The offending opcode.
        opcode: u8,
    },
    /// `RETURNDATACOPY` read past the end of the return data buffer.
    ReturnDataOutOfBounds {
        /// End offset that was requested.
        requested: usize,
        /// Size of the return data buffer.
        available: usize,
    },
    /// Memory expansion beyond the configured limit.
    MemoryLimitExceeded {
        /// Memory size that was requested.
        requested: usize,
        /// Maximum allowed size.
        limit: usize,
    },
    /// Nested call depth limit exceeded.
    CallDepthExceeded {
        /// Depth of the frame that would have been created.
        depth: usize,
        /// Maximum allowed depth.
        limit: usize,
    },
    /// Instruction count limit exceeded.
    InstructionLimitExceeded {
        /// Number of instructions executed.
        executed: u64,
        /// Maximum allowed.
        limit: u64,
    },
    /// Execution timeout.
    Timeout {
        /// Time elapsed.
        elapsed: Duration,
        /// Timeout limit.
        limit: Duration,
    },
}

impl EmulationError {
    /// Returns `true` for faults imposed by the analysis limits rather than by the virtual
    /// machine.
    ///
    /// These abort the whole run instead of being absorbed by the calling frame.
    #[must_use]
    pub fn is_execution_limit(&self) -> bool {
        matches!(
            self,
            EmulationError::InstructionLimitExceeded { .. } | EmulationError::Timeout { .. }
        )
    }
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationError::StackOverflow => write!(f, "stack overflow"),
            EmulationError::StackUnderflow => write!(f, "stack underflow"),
            EmulationError::InvalidOpcode { opcode, pc } => match opcodes::mnemonic(*opcode) {
                Some(name) => write!(f, "invalid opcode {name} at pc {pc}"),
                None => write!(f, "invalid opcode 0x{opcode:02x} at pc {pc}"),
            },
            EmulationError::InvalidJump { pc, target } => {
                write!(f, "invalid jump destination {target} at pc {pc}")
            }
            EmulationError::OutOfGas {
                required,
                remaining,
            } => {
                write!(f, "out of gas: required {required}, remaining {remaining}")
            }
            EmulationError::WriteProtection { opcode } => {
                let name = opcodes::mnemonic(*opcode).unwrap_or("unknown");
                write!(f, "write protection: {name} in static context")
            }
            EmulationError::ReturnDataOutOfBounds {
                requested,
                available,
            } => {
                write!(
                    f,
                    "return data out of bounds: requested {requested}, available {available}"
                )
            }
            EmulationError::MemoryLimitExceeded { requested, limit } => {
                write!(
                    f,
                    "memory limit exceeded: {requested} bytes (limit: {limit})"
                )
            }
            EmulationError::CallDepthExceeded { depth, limit } => {
                write!(f, "call depth exceeded: {depth} (limit: {limit})")
            }
            EmulationError::InstructionLimitExceeded { executed, limit } => {
                write!(f, "instruction limit exceeded: {executed} (limit: {limit})")
            }
            EmulationError::Timeout { elapsed, limit } => {
                write!(f, "execution timeout: {elapsed:?} (limit: {limit:?})")
            }
        }
    }
}

impl std::error::Error for EmulationError {}
