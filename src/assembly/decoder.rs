//! Linear EVM instruction decoding.
//!
//! EVM bytecode has exactly one variable-length construct: `PUSHn` carries `n` immediate bytes.
//! Decoding is therefore a single forward sweep that steps over push data, which is also how
//! valid jump destinations are discovered (a `0x5B` byte inside push data is not a `JUMPDEST`).
//!
//! # Usage Examples
//!
//! ```rust
//! use taintscope::assembly::{decode_instruction, decode_stream, opcodes};
//!
//! // PUSH1 0x2a, PUSH1 0x00, MSTORE
//! let code = [0x60, 0x2a, 0x60, 0x00, 0x52];
//!
//! let first = decode_instruction(&code, 0).unwrap();
//! assert_eq!(first.opcode, opcodes::PUSH1);
//! assert_eq!(first.size, 2);
//!
//! let stream = decode_stream(&code);
//! assert_eq!(stream.len(), 3);
//! assert_eq!(stream[2].offset, 4);
//! ```

use std::fmt;

use crate::{assembly::opcodes, emulation::Word};

/// A single decoded EVM instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the opcode within the code.
    pub offset: usize,
    /// The raw opcode byte.
    pub opcode: u8,
    /// Total size in bytes, including immediate data that is actually present.
    pub size: usize,
    /// Immediate operand of a push, zero-padded on the right when the code ends early.
    pub immediate: Option<Word>,
}

impl Instruction {
    /// Returns the mnemonic, or `None` for unassigned opcode bytes.
    #[must_use]
    pub fn mnemonic(&self) -> Option<&'static str> {
        opcodes::mnemonic(self.opcode)
    }

    /// Returns `true` if the push data of this instruction runs past the end of the code.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.size < 1 + opcodes::push_width(self.opcode)
    }

    /// Offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset + 1 + opcodes::push_width(self.opcode)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => write!(f, "{:04x}: {name}", self.offset)?,
            None => write!(f, "{:04x}: INVALID(0x{:02x})", self.offset, self.opcode)?,
        }
        if let Some(immediate) = &self.immediate {
            write!(f, " 0x{immediate:x}")?;
        }
        Ok(())
    }
}

/// Reads the immediate of a `PUSHn` at `offset` as a big-endian word.
///
/// Bytes past the end of `code` read as zero, as the virtual machine pads code with `STOP`.
#[must_use]
pub fn read_immediate(code: &[u8], offset: usize, width: usize) -> Word {
    let mut buffer = [0u8; 32];
    let start = offset.saturating_add(1).min(code.len());
    let end = start.saturating_add(width).min(code.len());
    let available = end - start;
    buffer[32 - width..32 - width + available].copy_from_slice(&code[start..end]);
    Word::from_be_bytes(buffer)
}

/// Decodes the instruction starting at `offset`.
///
/// Returns `None` when `offset` lies outside the code.
#[must_use]
pub fn decode_instruction(code: &[u8], offset: usize) -> Option<Instruction> {
    let opcode = *code.get(offset)?;
    let width = opcodes::push_width(opcode);

    let (size, immediate) = if width > 0 {
        let present = width.min(code.len() - offset - 1);
        (1 + present, Some(read_immediate(code, offset, width)))
    } else {
        (1, None)
    };

    Some(Instruction {
        offset,
        opcode,
        size,
        immediate,
    })
}

/// Decodes the entire code linearly, stepping over push data.
#[must_use]
pub fn decode_stream(code: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while let Some(instruction) = decode_instruction(code, offset) {
        offset = instruction.next_offset();
        instructions.push(instruction);
    }

    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes::*;

    #[test]
    fn decode_single() {
        let code = [ADD];
        let instr = decode_instruction(&code, 0).unwrap();

        assert_eq!(instr.opcode, ADD);
        assert_eq!(instr.size, 1);
        assert!(instr.immediate.is_none());
        assert!(decode_instruction(&code, 1).is_none());
    }

    #[test]
    fn decode_push_skips_data() {
        // PUSH2 0x5b5b, JUMPDEST
        let code = [PUSH2, 0x5B, 0x5B, JUMPDEST];
        let stream = decode_stream(&code);

        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].immediate, Some(Word::from(0x5B5B)));
        assert_eq!(stream[1].offset, 3);
        assert_eq!(stream[1].opcode, JUMPDEST);
    }

    #[test]
    fn decode_truncated_push() {
        let code = [PUSH4, 0x01, 0x02];
        let instr = decode_instruction(&code, 0).unwrap();

        assert!(instr.is_truncated());
        assert_eq!(instr.size, 3);
        assert_eq!(instr.immediate, Some(Word::from(0x0102_0000_u64)));
        assert_eq!(decode_stream(&code).len(), 1);
    }

    #[test]
    fn display() {
        let code = [PUSH1, 0x2A, 0x0C];
        let stream = decode_stream(&code);

        assert_eq!(stream[0].to_string(), "0000: PUSH1 0x2a");
        assert_eq!(stream[1].to_string(), "0002: INVALID(0x0c)");
    }
}
