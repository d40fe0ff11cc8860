//! Runtime value representation for EVM emulation.
//!
//! Two types make up every value the interpreter touches:
//!
//! - [`Word`] - the 256-bit unsigned machine word, with helpers in [`word`] for the signed
//!   opcodes and for address conversion
//! - [`TaintFlags`] - the tag carried alongside each word and each memory byte
//!
//! # Usage Examples
//!
//! ```rust
//! use taintscope::emulation::{word, TaintFlags, Word};
//!
//! let a = Word::MAX;
//! let b = Word::from(2u64);
//! let sum = a.wrapping_add(b);
//! assert_eq!(sum, Word::from(1u64));
//!
//! let tag = TaintFlags::EXTERNAL | TaintFlags::SAFE;
//! assert!(tag.is_external());
//! assert!(word::slt(Word::MAX, Word::ZERO));
//! ```

mod taint;
pub mod word;

pub use taint::TaintFlags;
pub use word::Word;
