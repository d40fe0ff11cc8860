//! EVM bytecode representation and decoding.
//!
//! This module holds everything that operates on contract code as data, independent of
//! execution: opcode constants and classification, linear decoding, jump destination
//! analysis and the shared [`Bytecode`] container used by call frames and hosts.
//!
//! # Key Components
//!
//! - [`opcodes`] - Raw opcode byte values, push widths, mnemonics, block boundaries
//! - [`Bytecode`] - Immutable code buffer with jump destination bitmap
//! - [`JumpDestMap`] - Bitfield of valid `JUMPDEST` offsets
//! - [`decode_instruction`] / [`decode_stream`] - Linear instruction decoding
//! - [`BytecodeEncoder`] - Assembler with label resolution
//!
//! # Examples
//!
//! ```rust
//! use taintscope::assembly::{opcodes, Bytecode};
//!
//! let code = Bytecode::new(vec![opcodes::PUSH1, 0x04, opcodes::JUMP, opcodes::STOP, opcodes::JUMPDEST]);
//! for instruction in code.instructions() {
//!     println!("{instruction}");
//! }
//! assert!(code.is_jumpdest(4));
//! ```

mod bytecode;
mod decoder;
mod encoder;
mod jumpdest;
pub mod opcodes;

pub use bytecode::Bytecode;
pub use decoder::{decode_instruction, decode_stream, read_immediate, Instruction};
pub use encoder::BytecodeEncoder;
pub use jumpdest::JumpDestMap;
