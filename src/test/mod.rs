//! Shared helpers for unit tests.
//!
//! Provides a tiny end-to-end harness around the interpreter plus a few constructors for
//! addresses, call data and bytecode, so individual test modules can stay focused on the
//! behavior they check.

use alloy_primitives::Address;

use crate::{
    assembly::{Bytecode, BytecodeEncoder},
    emulation::{
        AbortSignal, AnalysisConfig, AnalysisSession, CallFrame, ExecutionResult, InMemoryHost,
        Interpreter, Message, TraceWriter, Word, DEFAULT_GAS_LIMIT,
    },
    Result,
};

/// Address the code under test is installed at.
pub fn contract() -> Address {
    Address::repeat_byte(0xCC)
}

/// Sender of top-level test messages.
pub fn sender() -> Address {
    Address::repeat_byte(0x5E)
}

/// Encodes `words` as consecutive 32-byte big-endian call data.
pub fn calldata(words: &[Word]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|word| word.to_be_bytes::<32>())
        .collect()
}

/// Assembles a program with [`BytecodeEncoder`].
pub fn assemble(build: impl FnOnce(&mut BytecodeEncoder)) -> Bytecode {
    let mut encoder = BytecodeEncoder::new();
    build(&mut encoder);
    encoder.finalize().unwrap()
}

/// A fresh top-level frame running `code` with `input`.
pub fn frame(code: Bytecode, input: Vec<u8>) -> CallFrame {
    CallFrame::new(
        code,
        input,
        contract(),
        contract(),
        sender(),
        Word::ZERO,
        DEFAULT_GAS_LIMIT,
        false,
        0,
    )
}

/// World state, configuration and findings for one test.
pub struct TestRun {
    pub host: InMemoryHost,
    pub config: AnalysisConfig,
    pub abort: AbortSignal,
    pub session: AnalysisSession,
    pub tracer: Option<TraceWriter>,
}

impl TestRun {
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        TestRun {
            host: InMemoryHost::new(),
            config,
            abort: AbortSignal::new(),
            session: AnalysisSession::new(),
            tracer: None,
        }
    }

    /// Installs `code` at `address`.
    pub fn install(&self, address: Address, code: Bytecode) {
        self.host.insert_account(address, Word::ZERO, code);
    }

    /// Installs `code` at [`contract()`] and calls it with `input`.
    pub fn call(&mut self, code: Bytecode, input: Vec<u8>) -> Result<ExecutionResult> {
        self.install(contract(), code);
        let message = Message::call(sender(), contract()).with_input(input);
        self.execute(&message)
    }

    /// Runs an arbitrary message.
    pub fn execute(&mut self, message: &Message) -> Result<ExecutionResult> {
        Interpreter::new(
            &self.host,
            &mut self.session,
            &self.config,
            &self.abort,
            self.tracer.as_ref(),
        )
        .run(message)
    }
}
