//! Program counter for tracking execution position.
//!
//! The [`ProgramCounter`] tracks the current position within a frame's bytecode, supporting
//! sequential advancement past push immediates and absolute jumps.

use std::fmt;

/// Tracks the current execution position of a call frame.
///
/// # Example
///
/// ```rust
/// use taintscope::emulation::ProgramCounter;
///
/// let mut pc = ProgramCounter::new();
/// assert_eq!(pc.offset(), 0);
///
/// // PUSH2 occupies three bytes
/// pc.set_current_size(3);
/// pc.advance_current();
/// assert_eq!(pc.offset(), 3);
///
/// pc.jump_to(100);
/// assert_eq!(pc.offset(), 100);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProgramCounter {
    /// Byte offset of the current instruction.
    offset: usize,

    /// Size of the current instruction including its immediate.
    current_size: usize,
}

impl ProgramCounter {
    /// Creates a program counter at the start of the code.
    #[must_use]
    pub fn new() -> Self {
        ProgramCounter {
            offset: 0,
            current_size: 1,
        }
    }

    /// Returns the offset of the current instruction.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Sets the size of the current instruction.
    pub fn set_current_size(&mut self, size: usize) {
        self.current_size = size;
    }

    /// Returns the offset of the next sequential instruction.
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset.saturating_add(self.current_size)
    }

    /// Advances past the current instruction.
    pub fn advance_current(&mut self) {
        self.offset = self.next_offset();
        self.current_size = 1;
    }

    /// Moves to an absolute offset. The caller validates the destination.
    pub fn jump_to(&mut self, target: usize) {
        self.offset = target;
        self.current_size = 1;
    }
}

impl fmt::Debug for ProgramCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pc:{:04x}", self.offset)
    }
}

impl fmt::Display for ProgramCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.offset)
    }
}
