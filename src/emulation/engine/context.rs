//! Messages and call frames.
//!
//! A [`Message`] describes one invocation: who calls whom, with which input, value and gas. The
//! interpreter turns a message into a [`CallFrame`], the per-invocation execution state with its
//! own program counter, stack and memory. Frames are created for the top-level message and for
//! every nested `CALL`-family or `CREATE`-family instruction, and are discarded when they
//! terminate.

use std::{fmt, sync::Arc};

use alloy_primitives::{Address, B256};
use serde::Serialize;
use strum::{EnumCount, EnumIter};

use crate::{
    assembly::Bytecode,
    emulation::{
        engine::{gas::GasMeter, pointer::ProgramCounter},
        Cell, TaintedMemory, TaintedStack, Word,
    },
};

/// The flavor of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Plain message call.
    Call,
    /// Runs the target's code in the caller's context, with a value.
    CallCode,
    /// Runs the target's code in the caller's context, keeping caller and value.
    DelegateCall,
    /// Read-only message call.
    StaticCall,
    /// Contract creation with a nonce-derived address.
    Create,
    /// Contract creation with a salt-derived address.
    Create2,
}

impl CallKind {
    /// Returns `true` for the creation kinds.
    #[must_use]
    pub const fn is_create(self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::Call => "CALL",
            CallKind::CallCode => "CALLCODE",
            CallKind::DelegateCall => "DELEGATECALL",
            CallKind::StaticCall => "STATICCALL",
            CallKind::Create => "CREATE",
            CallKind::Create2 => "CREATE2",
        };
        f.write_str(name)
    }
}

/// A top-level invocation handed to the emulator.
///
/// # Examples
///
/// ```rust
/// use alloy_primitives::Address;
/// use taintscope::emulation::{Message, Word};
///
/// let message = Message::call(Address::repeat_byte(0x01), Address::repeat_byte(0x02))
///     .with_input(vec![0xa9, 0x05, 0x9c, 0xbb])
///     .with_value(Word::from(1u64))
///     .with_gas_limit(100_000);
///
/// assert_eq!(message.input.len(), 4);
/// assert!(!message.is_static);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Flavor of the invocation.
    pub kind: CallKind,
    /// Sender.
    pub caller: Address,
    /// Account whose storage and balance the code runs against. Ignored for creation, where the
    /// address is derived.
    pub target: Address,
    /// Value transferred with the message.
    pub value: Word,
    /// Call data, or the init code for creation.
    pub input: Vec<u8>,
    /// Gas available to the top-level frame.
    pub gas_limit: u64,
    /// Whether the frame runs read-only.
    pub is_static: bool,
    /// Salt for `CREATE2`-style creation.
    pub salt: Option<B256>,
}

impl Message {
    /// Creates a call from `caller` to `target` with no input, no value and the default gas
    /// limit.
    #[must_use]
    pub fn call(caller: Address, target: Address) -> Self {
        Message {
            kind: CallKind::Call,
            caller,
            target,
            value: Word::ZERO,
            input: Vec::new(),
            gas_limit: crate::emulation::DEFAULT_GAS_LIMIT,
            is_static: false,
            salt: None,
        }
    }

    /// Creates a contract creation running `init_code`.
    #[must_use]
    pub fn create(caller: Address, init_code: impl Into<Vec<u8>>) -> Self {
        Message {
            kind: CallKind::Create,
            input: init_code.into(),
            ..Message::call(caller, Address::ZERO)
        }
    }

    /// Sets the call data (or init code).
    #[must_use]
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    /// Sets the transferred value.
    #[must_use]
    pub fn with_value(mut self, value: Word) -> Self {
        self.value = value;
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Makes the call read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.kind = CallKind::StaticCall;
        self.is_static = true;
        self
    }

    /// Turns a creation into a salted creation.
    #[must_use]
    pub fn with_salt(mut self, salt: B256) -> Self {
        self.kind = CallKind::Create2;
        self.salt = Some(salt);
        self
    }
}

/// Execution state of one invocation.
///
/// Owns the frame-local stack and memory; both are dropped with the frame. The run-wide
/// findings live in the [`AnalysisSession`](crate::emulation::AnalysisSession) instead.
#[derive(Debug)]
pub struct CallFrame {
    /// Code being executed.
    pub code: Bytecode,
    /// Position in `code`.
    pub pc: ProgramCounter,
    /// Operand stack.
    pub stack: TaintedStack,
    /// Linear memory.
    pub memory: TaintedMemory,
    /// Call data.
    pub input: Arc<[u8]>,
    /// Account whose storage and balance the frame uses (`ADDRESS`).
    pub address: Address,
    /// Account the code was loaded from.
    pub code_address: Address,
    /// `CALLER`.
    pub caller: Address,
    /// `CALLVALUE`.
    pub value: Word,
    /// Frame gas.
    pub gas: GasMeter,
    /// Output of the most recent child frame, with its tags.
    pub return_data: Vec<Cell>,
    /// Bytes handed back by `RETURN` or `REVERT`.
    pub output: Vec<Cell>,
    /// Read-only context.
    pub is_static: bool,
    /// Nesting depth; the top-level frame is 0.
    pub depth: usize,
}

impl CallFrame {
    /// Creates a fresh frame.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        code: Bytecode,
        input: impl Into<Arc<[u8]>>,
        address: Address,
        code_address: Address,
        caller: Address,
        value: Word,
        gas_limit: u64,
        is_static: bool,
        depth: usize,
    ) -> Self {
        CallFrame {
            code,
            pc: ProgramCounter::new(),
            stack: TaintedStack::new(),
            memory: TaintedMemory::new(),
            input: input.into(),
            address,
            code_address,
            caller,
            value,
            gas: GasMeter::new(gas_limit),
            return_data: Vec::new(),
            output: Vec::new(),
            is_static,
            depth,
        }
    }

    /// Opcode at the current position, `None` past the end of the code.
    #[must_use]
    pub fn current_opcode(&self) -> Option<u8> {
        self.code.op_at(self.pc.offset())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn message_builders() {
        let caller = Address::repeat_byte(0x11);
        let message = Message::create(caller, vec![0x00]).with_salt(B256::repeat_byte(0x22));

        assert_eq!(message.kind, CallKind::Create2);
        assert_eq!(message.input, vec![0x00]);
        assert_eq!(message.caller, caller);

        let read = Message::call(caller, Address::ZERO).read_only();
        assert!(read.is_static);
        assert_eq!(read.kind, CallKind::StaticCall);
    }

    #[test]
    fn kind_classification() {
        let creates = CallKind::iter().filter(|kind| kind.is_create()).count();
        assert_eq!(creates, 2);
        assert_eq!(CallKind::COUNT, 6);
        assert_eq!(CallKind::DelegateCall.to_string(), "DELEGATECALL");
    }

    #[test]
    fn frame_starts_at_zero() {
        let frame = CallFrame::new(
            Bytecode::new(vec![0x60, 0x01]),
            Vec::new(),
            Address::ZERO,
            Address::ZERO,
            Address::ZERO,
            Word::ZERO,
            1000,
            false,
            0,
        );
        assert_eq!(frame.current_opcode(), Some(0x60));
        assert_eq!(frame.gas.remaining(), 1000);
        assert!(frame.stack.is_empty());
    }
}
