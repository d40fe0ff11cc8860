//! Bytecode assembly with label resolution.
//!
//! [`BytecodeEncoder`] is the reverse counterpart of the decoder: it emits raw opcodes and push
//! immediates and resolves named jump targets once the whole program is known. Labels become
//! `JUMPDEST`s; references to them are emitted as `PUSH2` placeholders and patched during
//! [`BytecodeEncoder::finalize`].
//!
//! # Usage Examples
//!
//! ```rust
//! use taintscope::assembly::{opcodes::*, BytecodeEncoder};
//! use taintscope::emulation::Word;
//!
//! let mut encoder = BytecodeEncoder::new();
//! encoder
//!     .push(Word::ZERO)
//!     .emit(CALLDATALOAD)
//!     .jumpi("nonzero")
//!     .emit(STOP)
//!     .label("nonzero")
//!     .emit(STOP);
//!
//! assert_eq!(encoder.label_offset("nonzero"), Some(8));
//! let code = encoder.finalize()?;
//! assert!(code.is_jumpdest(8));
//! # Ok::<(), taintscope::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{opcodes::*, Bytecode},
    emulation::Word,
    Error, Result,
};

/// Width of the push immediate used for label references.
const LABEL_WIDTH: usize = 2;

/// A pending reference to a label, patched on finalize.
#[derive(Debug, Clone)]
struct LabelFixup {
    /// Label name.
    label: String,
    /// Offset of the first immediate byte of the `PUSH2`.
    position: usize,
}

/// Assembles EVM bytecode.
///
/// Emitting methods return `&mut Self` so programs can be written as chains. Label errors are
/// collected and reported by [`BytecodeEncoder::finalize`].
#[derive(Debug, Clone, Default)]
pub struct BytecodeEncoder {
    code: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<LabelFixup>,
    duplicate: Option<String>,
}

impl BytecodeEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single opcode.
    pub fn emit(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    /// Appends a sequence of opcodes.
    pub fn emit_all(&mut self, opcodes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(opcodes);
        self
    }

    /// Pushes `value` with the smallest `PUSHn`, `n >= 1`, that holds it.
    pub fn push(&mut self, value: Word) -> &mut Self {
        let width = value.byte_len().max(1);
        let bytes = value.to_be_bytes::<32>();
        self.push_immediate(&bytes[32 - width..])
    }

    /// Pushes a small constant.
    pub fn push_u64(&mut self, value: u64) -> &mut Self {
        self.push(Word::from(value))
    }

    /// Pushes `bytes` verbatim with `PUSH<len>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] unless `bytes` holds 1 to 32 bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        if bytes.is_empty() || bytes.len() > 32 {
            return Err(malformed_error!(
                "Push immediate must be 1 to 32 bytes, got {}",
                bytes.len()
            ));
        }
        Ok(self.push_immediate(bytes))
    }

    /// Pushes the offset of `label`.
    pub fn push_label(&mut self, label: &str) -> &mut Self {
        self.code.push(PUSH2);
        self.fixups.push(LabelFixup {
            label: label.to_string(),
            position: self.code.len(),
        });
        self.code.extend_from_slice(&[0; LABEL_WIDTH]);
        self
    }

    /// Emits an unconditional jump to `label`.
    pub fn jump(&mut self, label: &str) -> &mut Self {
        self.push_label(label).emit(JUMP)
    }

    /// Emits a conditional jump to `label`, consuming the condition on the stack.
    pub fn jumpi(&mut self, label: &str) -> &mut Self {
        self.push_label(label).emit(JUMPI)
    }

    /// Defines `label` at the current position and emits its `JUMPDEST`.
    pub fn label(&mut self, name: &str) -> &mut Self {
        if self.labels.insert(name.to_string(), self.code.len()).is_some() {
            self.duplicate.get_or_insert_with(|| name.to_string());
        }
        self.emit(JUMPDEST)
    }

    /// Offset the next emitted byte will have.
    #[must_use]
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Offset of a defined label.
    #[must_use]
    pub fn label_offset(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Resolves all label references and returns the assembled code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] or [`Error::UndefinedLabel`] for label misuse, and
    /// [`Error::Malformed`] if a label lies beyond the reach of a `PUSH2`.
    pub fn finalize(mut self) -> Result<Bytecode> {
        if let Some(name) = self.duplicate.take() {
            return Err(Error::DuplicateLabel(name));
        }

        for fixup in &self.fixups {
            let target = *self
                .labels
                .get(&fixup.label)
                .ok_or_else(|| Error::UndefinedLabel(fixup.label.clone()))?;
            let target = u16::try_from(target)
                .map_err(|_| malformed_error!("Label '{}' at {} exceeds PUSH2", fixup.label, target))?;
            self.code[fixup.position..fixup.position + LABEL_WIDTH]
                .copy_from_slice(&target.to_be_bytes());
        }

        Ok(Bytecode::new(self.code))
    }

    fn push_immediate(&mut self, bytes: &[u8]) -> &mut Self {
        // len is 1..=32 here
        self.code.push(PUSH0 + bytes.len() as u8);
        self.code.extend_from_slice(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_push_width() {
        let mut encoder = BytecodeEncoder::new();
        encoder
            .push(Word::ZERO)
            .push_u64(0x1234)
            .push(Word::MAX);
        let code = encoder.finalize().unwrap();

        assert_eq!(&code.bytes()[..5], &[PUSH1, 0x00, PUSH2, 0x12, 0x34]);
        assert_eq!(code.bytes()[5], PUSH32);
        assert_eq!(code.len(), 5 + 33);
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        let mut encoder = BytecodeEncoder::new();
        encoder.label("top").jump("end").jumpi("top").label("end").emit(STOP);
        let code = encoder.finalize().unwrap();

        // JUMPDEST PUSH2 00 09 JUMP PUSH2 00 00 JUMPI JUMPDEST STOP
        assert_eq!(
            code.bytes(),
            &[JUMPDEST, PUSH2, 0x00, 0x09, JUMP, PUSH2, 0x00, 0x00, JUMPI, JUMPDEST, STOP]
        );
        assert!(code.is_jumpdest(0));
        assert!(code.is_jumpdest(9));
    }

    #[test]
    fn undefined_label() {
        let mut encoder = BytecodeEncoder::new();
        encoder.jump("nowhere");
        assert!(matches!(
            encoder.finalize(),
            Err(Error::UndefinedLabel(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn duplicate_label() {
        let mut encoder = BytecodeEncoder::new();
        encoder.label("a").label("a");
        assert!(matches!(encoder.finalize(), Err(Error::DuplicateLabel(_))));
    }

    #[test]
    fn push_bytes_bounds() {
        let mut encoder = BytecodeEncoder::new();
        assert!(encoder.push_bytes(&[]).is_err());
        assert!(encoder.push_bytes(&[0; 33]).is_err());
        encoder.push_bytes(&[0xAA, 0xBB]).unwrap();
        assert_eq!(encoder.position(), 3);
    }
}
