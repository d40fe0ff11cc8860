use thiserror::Error;

use crate::emulation::EmulationError;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Execution faults raised while running bytecode are wrapped in [`Error::Emulation`]; everything
/// else concerns loading input, configuring a process or exporting analysis results.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Bytecode or hex input could not be decoded
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::DuplicateLabel`] / [`Error::UndefinedLabel`] - Label misuse in [`crate::assembly::BytecodeEncoder`]
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Json`] - Serialization of reports or trace events failed
///
/// ## Execution Errors
/// - [`Error::Emulation`] - A frame-fatal fault reached the top-level frame
/// - [`Error::Configuration`] - A process was built from an unusable configuration
///
/// # Examples
///
/// ```rust
/// use taintscope::{assembly::Bytecode, Error};
///
/// match Bytecode::from_hex("0x6001zz") {
///     Ok(code) => println!("{} bytes", code.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed input: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while reading bytecode files or writing traces.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// JSON serialization error.
    ///
    /// Raised when an analysis report or a trace event cannot be rendered.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// An execution fault terminated the top-level frame.
    ///
    /// Faults inside nested frames are absorbed by the calling frame, exactly like the
    /// virtual machine does; only a fault of the outermost frame surfaces here.
    #[error("Emulation error: {0}")]
    Emulation(#[from] EmulationError),

    /// A label was defined twice while encoding bytecode.
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    /// A jump referenced a label that was never defined.
    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    /// The process configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// General error with a custom message.
    #[error("{0}")]
    Error(String),
}
