// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # taintscope
//!
//! A taint-tracking EVM interpreter for smart-contract bytecode. `taintscope` runs contracts
//! while tagging every value derived from call data, reports externally driven integer
//! overflows (telling compiler-guarded arithmetic apart from unguarded arithmetic), and records
//! the branch distances and taken jumps a coverage-guided fuzzer needs to steer its inputs.
//!
//! ## Features
//!
//! - **Per-value taint** - every stack entry and memory byte carries its own tag
//! - **Overflow findings** - wrapping `ADD`, `SUB`, `MUL` and `ADDMOD` on attacker input,
//!   classified against a catalogue of solc guard idioms
//! - **Branch distance feedback** - how far each tainted comparison is from flipping
//! - **Full call semantics** - nested `CALL`/`DELEGATECALL`/`STATICCALL` and `CREATE`/`CREATE2`
//!   with taint flowing back through return data
//! - **Parallel batches** - independent runs share one world state and run on `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use taintscope::prelude::*;
//! use std::sync::Arc;
//!
//! // x + 1, where x comes from call data
//! let mut code = BytecodeEncoder::new();
//! code.push_u64(1).push_u64(0).emit(CALLDATALOAD).emit(ADD).emit(STOP);
//!
//! let target = Address::repeat_byte(0xCC);
//! let host = Arc::new(InMemoryHost::new());
//! host.insert_account(target, Word::ZERO, code.finalize()?);
//!
//! let process = ProcessBuilder::new().host(host).build()?;
//! let message = Message::call(Address::ZERO, target).with_input(vec![0xFF; 32]);
//! let (result, session) = process.analyze(&message)?;
//!
//! assert!(result.is_success());
//! assert!(session.aggregate().has_unprotected_overflow());
//! # Ok::<(), taintscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `taintscope` is organized into a few modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`assembly`] - Opcodes, bytecode loading, jump destination analysis and an assembler
//! - [`emulation`] - The taint-tracking interpreter, guard scanner, findings and process model
//! - [`Error`] and [`Result`] - Error handling
//!
//! ### Findings
//!
//! Findings are advisory. They are collected in an
//! [`AnalysisSession`](emulation::AnalysisSession) and never change how code executes:
//!
//! - **Aggregated flags**: OR of every tag and finding bit observed during the run
//! - **Path record**: `(pc, destination)` of each taken conditional jump
//! - **Cost record**: for each tainted comparison feeding a `JUMPI`, the distance to making it
//!   false and the distance to making it true
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] with [`Error`]. Execution faults of the top-level
//! frame surface as [`Error::Emulation`]; faults of nested frames are absorbed by their caller
//! the way the virtual machine does.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use taintscope::prelude::*;
///
/// let config = AnalysisConfig::fuzzing();
/// assert_eq!(config.selector_load_pc, Some(SOLC_SELECTOR_LOAD_PC));
/// ```
pub mod prelude;

/// EVM bytecode: opcodes, decoding and assembly.
///
/// This module provides the static side of the analysis:
///
/// - **Opcodes**: byte constants, push widths, mnemonics and block boundaries
/// - **Bytecode**: immutable code with its valid jump destinations, loaded from bytes, hex or files
/// - **Decoding**: instruction iteration with push immediates
/// - **Assembly**: [`BytecodeEncoder`](assembly::BytecodeEncoder) with label resolution
///
/// # Example
///
/// ```rust
/// use taintscope::assembly::Bytecode;
///
/// let code = Bytecode::from_hex("0x600a565b00")?;
/// assert_eq!(code.len(), 5);
/// # Ok::<(), taintscope::Error>(())
/// ```
pub mod assembly;

/// Taint-tracking execution.
///
/// See the module documentation for the architecture and an end-to-end example.
pub mod emulation;

/// `taintscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use taintscope::{assembly::Bytecode, Result};
///
/// fn load(hex: &str) -> Result<Bytecode> {
///     Bytecode::from_hex(hex)
/// }
/// assert!(load("zz").is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `taintscope` Error type
///
/// The main error type for all operations in this crate. Provides detailed error information
/// for bytecode loading, configuration and execution.
///
/// # Examples
///
/// ```rust
/// use taintscope::{assembly::Bytecode, Error};
///
/// match Bytecode::from_hex("0x6") {
///     Ok(_) => println!("Loaded"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;
