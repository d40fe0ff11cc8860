//! Frame-local storage: the operand stack and linear memory.
//!
//! Both structures pair every value with its [`TaintFlags`](crate::emulation::TaintFlags) inside
//! a single container:
//!
//! - [`TaintedStack`] - stack of [`Slot`]s (word + tag), bounded at [`STACK_LIMIT`]
//! - [`TaintedMemory`] - byte array of [`Cell`]s (byte + tag), grown in 32-byte words
//!
//! Both are created fresh for every call frame and dropped when the frame returns.

mod linear;
mod stack;

pub use linear::{cell_bytes, cell_taint, Cell, TaintedMemory};
pub use stack::{Slot, TaintedStack, STACK_LIMIT};
