//! Protection pattern scanner.
//!
//! When externally driven arithmetic wraps around, the interpreter asks this module whether the
//! instruction is already guarded by a recognizable developer check. Guarded findings are
//! classified as `PROTECTED_OVERFLOW`, unguarded ones as `OVERFLOW`.
//!
//! # Algorithm
//!
//! Two independent linear scans start at the arithmetic instruction, one towards higher
//! offsets and one towards lower offsets. Each scan stops at the first block boundary
//! ([`is_block_boundary`](crate::assembly::opcodes::is_block_boundary)) or at the edge of the
//! code, which bounds it to the local basic block. At every position inside that horizon the
//! scan tries the [`GuardTemplate`]s of the instruction's [`ArithmeticFamily`] and direction.
//!
//! Templates are exact: fixed relative offsets, fixed opcodes, no wildcards. Bytes are read
//! raw, so push data is not skipped. Missing a guard only costs a false `OVERFLOW`; the
//! catalogue is extended by adding entries to [`CATALOGUE`], never by inference.
//!
//! The same module also answers the adjacency question for branch-cost recording
//! ([`feeds_conditional_jump`]).

mod scanner;
mod template;

pub use scanner::{feeds_conditional_jump, is_protected, matching_template};
pub use template::{templates, ArithmeticFamily, GuardTemplate, ScanDirection, CATALOGUE};
