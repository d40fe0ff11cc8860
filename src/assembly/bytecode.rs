//! Immutable contract code with precomputed jump destinations.
//!
//! [`Bytecode`] is the unit of code every call frame executes. It is cheap to clone (the code
//! buffer and the [`JumpDestMap`] are shared behind `Arc`s), so hosts can hand out the same
//! contract to any number of frames and threads.
//!
//! # Loading
//!
//! - [`Bytecode::new`] / [`From<Vec<u8>>`] - raw bytes already in memory
//! - [`Bytecode::from_hex`] - hex text, with or without a `0x` prefix
//! - [`Bytecode::from_file`] - a file holding either raw bytecode or hex text
//!
//! # Examples
//!
//! ```rust
//! use taintscope::assembly::Bytecode;
//!
//! let code = Bytecode::from_hex("0x5b600056")?;
//! assert_eq!(code.len(), 4);
//! assert!(code.is_jumpdest(0));
//! # Ok::<(), taintscope::Error>(())
//! ```

use std::{fmt, fs, path::Path, sync::Arc};

use alloy_primitives::{hex, keccak256};
use memmap2::Mmap;

use crate::{
    assembly::{
        decoder::{decode_stream, read_immediate, Instruction},
        jumpdest::JumpDestMap,
    },
    emulation::Word,
    Error::{self, FileError},
    Result,
};

/// Contract bytecode and its jump destination analysis.
#[derive(Clone, PartialEq, Eq)]
pub struct Bytecode {
    code: Arc<[u8]>,
    jumpdests: Arc<JumpDestMap>,
}

impl Bytecode {
    /// Wraps raw bytecode and runs jump destination analysis over it.
    #[must_use]
    pub fn new(code: impl Into<Vec<u8>>) -> Self {
        let code: Vec<u8> = code.into();
        let jumpdests = JumpDestMap::analyze(&code);

        Bytecode {
            code: Arc::from(code),
            jumpdests: Arc::new(jumpdests),
        }
    }

    /// Decodes hex text into bytecode.
    ///
    /// Surrounding whitespace and a leading `0x` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for empty input and [`Error::Malformed`] if the text is not valid
    /// hex.
    pub fn from_hex(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(Error::Empty);
        }

        let bytes =
            hex::decode(digits).map_err(|error| malformed_error!("Invalid hex bytecode - {}", error))?;
        Ok(Bytecode::new(bytes))
    }

    /// Loads bytecode from a file.
    ///
    /// Files whose content is hex text (as emitted by `solc --bin-runtime`) are decoded, any
    /// other content is taken as raw bytecode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be opened or mapped, [`Error::Empty`] for
    /// an empty file and [`Error::Malformed`] for broken hex text.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        if file.metadata()?.len() == 0 {
            return Err(Error::Empty);
        }

        let data = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(FileError(error)),
        };

        if looks_like_hex(&data) {
            let text = std::str::from_utf8(&data)
                .map_err(|error| malformed_error!("Invalid hex bytecode - {}", error))?;
            Bytecode::from_hex(text)
        } else {
            Ok(Bytecode::new(data.to_vec()))
        }
    }

    /// Returns the raw code bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    /// Length of the code in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns `true` for empty code (an account without a contract).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Returns the opcode at `offset`, or `None` outside the code.
    #[must_use]
    pub fn op_at(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Returns `true` if `offset` holds a `JUMPDEST` outside of push data.
    #[must_use]
    pub fn is_jumpdest(&self, offset: usize) -> bool {
        self.jumpdests.get(offset)
    }

    /// The jump destination analysis of this code.
    #[must_use]
    pub fn jumpdests(&self) -> &JumpDestMap {
        &self.jumpdests
    }

    /// Reads the `width`-byte push immediate following `offset`, zero-padded past the end.
    #[must_use]
    pub fn push_operand(&self, offset: usize, width: usize) -> Word {
        read_immediate(&self.code, offset, width)
    }

    /// Keccak-256 hash of the code, as returned by `EXTCODEHASH`.
    #[must_use]
    pub fn hash(&self) -> Word {
        Word::from_be_bytes(keccak256(&self.code).0)
    }

    /// Linear disassembly of the whole code.
    #[must_use]
    pub fn instructions(&self) -> Vec<Instruction> {
        decode_stream(&self.code)
    }
}

impl Default for Bytecode {
    fn default() -> Self {
        Bytecode::new(Vec::new())
    }
}

impl From<Vec<u8>> for Bytecode {
    fn from(code: Vec<u8>) -> Self {
        Bytecode::new(code)
    }
}

impl From<&[u8]> for Bytecode {
    fn from(code: &[u8]) -> Self {
        Bytecode::new(code.to_vec())
    }
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytecode")
            .field("len", &self.code.len())
            .field("jumpdests", &self.jumpdests.count())
            .finish()
    }
}

fn looks_like_hex(data: &[u8]) -> bool {
    let body = data.trim_ascii();
    let body = body
        .strip_prefix(b"0x")
        .or_else(|| body.strip_prefix(b"0X"))
        .unwrap_or(body);

    !body.is_empty() && body.iter().all(u8::is_ascii_hexdigit)
}
