//! Core EVM instruction interpreter.
//!
//! The [`Interpreter`] owns the dispatch loop. It runs one [`CallFrame`] at a time, one
//! instruction per [`Interpreter::step`], and recurses into a fresh child frame for every call
//! or contract creation. Taint propagation is not a separate pass: every handler updates the
//! tag of each slot and memory byte it writes, and reports findings into the
//! [`AnalysisSession`] it was given.
//!
//! Faults raised by a handler terminate the frame that raised them. The parent observes a failed
//! call and continues; only the execution limits of [`EmulationLimits`] abort the whole run.
//!
//! [`EmulationLimits`]: crate::emulation::EmulationLimits

mod calls;
mod handlers;


use std::mem;

use tracing::{debug, trace};

use crate::{
    assembly::opcodes::{self, *},
    emulation::{
        cell_taint,
        engine::{
            context::{CallFrame, Message},
            error::EmulationError,
            gas,
            result::{ExecutionResult, FrameOutcome, FrameStatus, StepResult},
            stats::ExecutionStats,
            trace::{TraceEvent, TraceWriter},
        },
        process::{AbortSignal, AnalysisConfig, CancellationGranularity, Checkpoint, Host},
        word, AnalysisSession, CallKind, TaintFlags, Word,
    },
    Error, Result,
};

/// Core EVM instruction interpreter.
///
/// An interpreter borrows everything it works with: the world state through [`Host`], the
/// findings sink, the configuration and the abort signal. It is cheap to create and lives for
/// exactly one top-level run.
///
/// # Example
///
/// ```rust
/// use alloy_primitives::Address;
/// use taintscope::{
///     assembly::Bytecode,
///     emulation::{AbortSignal, AnalysisConfig, AnalysisSession, InMemoryHost, Interpreter, Message, Word},
/// };
///
/// let contract = Address::repeat_byte(0xCC);
/// let host = InMemoryHost::new();
/// // PUSH1 0 CALLDATALOAD PUSH1 1 ADD STOP
/// host.insert_account(contract, Word::ZERO, Bytecode::new(vec![0x60, 0x00, 0x35, 0x60, 0x01, 0x01, 0x00]));
///
/// let config = AnalysisConfig::default();
/// let abort = AbortSignal::new();
/// let mut session = AnalysisSession::new();
/// let mut interpreter = Interpreter::new(&host, &mut session, &config, &abort, None);
///
/// let message = Message::call(Address::ZERO, contract).with_input(vec![0xFF; 32]);
/// let result = interpreter.run(&message)?;
/// assert!(result.is_success());
/// assert!(session.flags().contains(taintscope::emulation::TaintFlags::OVERFLOW));
/// # Ok::<(), taintscope::Error>(())
/// ```
pub struct Interpreter<'a> {
    /// World state.
    host: &'a dyn Host,

    /// Sink for findings of this run.
    session: &'a mut AnalysisSession,

    /// Limits, cancellation and taint source settings.
    config: &'a AnalysisConfig,

    /// Cooperative cancellation flag.
    abort: &'a AbortSignal,

    /// Optional trace output.
    tracer: Option<&'a TraceWriter>,

    /// Execution statistics.
    stats: ExecutionStats,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter for one run.
    #[must_use]
    pub fn new(
        host: &'a dyn Host,
        session: &'a mut AnalysisSession,
        config: &'a AnalysisConfig,
        abort: &'a AbortSignal,
        tracer: Option<&'a TraceWriter>,
    ) -> Self {
        Interpreter {
            host,
            session,
            config,
            abort,
            tracer,
            stats: ExecutionStats::new(),
        }
    }

    /// Returns a reference to the execution statistics.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns the findings recorded so far.
    #[must_use]
    pub fn session(&self) -> &AnalysisSession {
        self.session
    }

    /// Executes a top-level message.
    ///
    /// Calls run the code installed at the target. Creations run the message input as init code
    /// and install the returned bytes at the derived address. Top-level messages do not move
    /// value; `CALLVALUE` still reports [`Message::value`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if the top-level frame faults or an execution limit is hit
    /// anywhere in the call tree. Reverts and aborts are not errors; they are reported through
    /// [`ExecutionResult::status`].
    pub fn run(&mut self, message: &Message) -> Result<ExecutionResult> {
        self.stats.start();
        debug!(
            kind = %message.kind,
            target = %message.target,
            input_len = message.input.len(),
            gas = message.gas_limit,
            "starting run"
        );

        let result = self.run_message(message);
        if let Some(tracer) = self.tracer {
            tracer.flush();
        }
        let result = result?;
        debug!(
            %result,
            frames = self.stats.frames_entered,
            max_depth = self.stats.max_depth,
            "run finished"
        );
        Ok(result)
    }

    fn run_message(&mut self, message: &Message) -> Result<ExecutionResult> {
        let (outcome, created) = if message.kind.is_create() {
            let nonce = self.host.bump_nonce(message.caller);
            let address = match message.salt {
                Some(salt) => message.caller.create2_from_code(salt, &message.input),
                None => message.caller.create(nonce),
            };
            let checkpoint = self.host.checkpoint();
            let outcome = self.deploy(
                message.kind,
                message.caller,
                address,
                message.value,
                message.input.clone(),
                message.gas_limit,
                0,
            );
            let outcome = self.settle(checkpoint, outcome)?;
            let created = outcome.status.is_success().then_some(address);
            (outcome, created)
        } else {
            let code = self.host.code(message.target);
            let mut frame = CallFrame::new(
                code,
                message.input.clone(),
                message.target,
                message.target,
                message.caller,
                message.value,
                message.gas_limit,
                message.is_static,
                0,
            );
            self.trace_call(message.kind, &frame);
            let checkpoint = self.host.checkpoint();
            let outcome = self.run_frame(&mut frame);
            (self.settle(checkpoint, outcome)?, None)
        };

        if let FrameStatus::Faulted(error) = &outcome.status {
            return Err(Error::Emulation(error.clone()));
        }

        Ok(ExecutionResult::from_outcome(
            outcome,
            message.gas_limit,
            self.stats.instructions_executed,
            created,
        ))
    }

    /// Keeps the state changes of a successful frame and undoes those of a frame that reverted,
    /// faulted, aborted or was unwound by an execution limit.
    fn settle(
        &self,
        checkpoint: Checkpoint,
        outcome: Result<FrameOutcome>,
    ) -> Result<FrameOutcome> {
        match &outcome {
            Ok(outcome) if outcome.status.is_success() => self.host.commit(checkpoint),
            _ => self.host.revert(checkpoint),
        }
        outcome
    }

    /// Runs `frame` to termination.
    ///
    /// Faults are absorbed into [`FrameStatus::Faulted`] except for execution limits, which
    /// propagate so that every ancestor frame unwinds as well.
    pub(crate) fn run_frame(&mut self, frame: &mut CallFrame) -> Result<FrameOutcome> {
        self.stats.enter_depth(frame.depth);

        let status = loop {
            match self.step(frame) {
                Ok(StepResult::Continue) => frame.pc.advance_current(),
                Ok(StepResult::Jump { target }) => frame.pc.jump_to(target),
                Ok(StepResult::Halt(status)) => break status,
                Err(Error::Emulation(error)) if !error.is_execution_limit() => {
                    break FrameStatus::Faulted(error)
                }
                Err(error) => return Err(error),
            }
        };

        Ok(self.finish_frame(frame, status))
    }

    /// Executes a single instruction of `frame`.
    ///
    /// Execution past the end of the code behaves like `STOP`.
    ///
    /// # Errors
    ///
    /// Returns an error if an execution limit is exceeded or the instruction faults.
    pub fn step(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        if let Some(exceeded) = self.stats.check_limits(&self.config.limits) {
            return Err(EmulationError::from(exceeded).into());
        }
        if self.config.cancellation == CancellationGranularity::EveryInstruction
            && self.abort.is_aborted()
        {
            return Ok(StepResult::Halt(FrameStatus::Aborted));
        }

        let Some(opcode) = frame.current_opcode() else {
            return Ok(StepResult::Halt(FrameStatus::Stopped));
        };

        self.stats.increment_instructions();
        frame.pc.set_current_size(1 + opcodes::push_width(opcode));

        trace!(
            depth = frame.depth,
            pc = frame.pc.offset(),
            op = opcodes::mnemonic(opcode).unwrap_or("UNKNOWN"),
            stack = frame.stack.len(),
            "step"
        );
        self.trace_instruction(frame, opcode);

        frame.gas.charge(gas::static_cost(opcode))?;
        self.execute(frame, opcode)
    }

    /// Dispatches one opcode to its handler.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        match opcode {
            // ================================================================
            // Stop and arithmetic
            // ================================================================
            STOP => Ok(StepResult::Halt(FrameStatus::Stopped)),
            ADD | SUB | MUL => self.checked_arithmetic(frame, opcode),
            ADDMOD => self.addmod(frame),
            MULMOD => self.ternary(frame, |a, b, n| a.mul_mod(b, n)),
            DIV => self.binary(frame, |a, b| a.checked_div(b).unwrap_or_default()),
            SDIV => self.binary(frame, word::sdiv),
            MOD => self.binary(frame, |a, b| a.checked_rem(b).unwrap_or_default()),
            SMOD => self.binary(frame, word::smod),
            EXP => self.exp(frame),
            SIGNEXTEND => self.binary(frame, word::signextend),

            // ================================================================
            // Comparison and bitwise logic
            // ================================================================
            LT | GT | EQ => self.tracked_comparison(frame, opcode),
            SLT => self.binary(frame, |a, b| {
                word::from_bool(word::slt(a, b))
            }),
            SGT => self.binary(frame, |a, b| {
                word::from_bool(word::sgt(a, b))
            }),
            ISZERO => self.unary(frame, |a| word::from_bool(a.is_zero())),
            AND => self.binary(frame, |a, b| a & b),
            OR => self.binary(frame, |a, b| a | b),
            XOR => self.binary(frame, |a, b| a ^ b),
            NOT => self.unary(frame, |a| !a),
            BYTE => self.binary(frame, word::byte),
            SHL => self.binary(frame, word::shl),
            SHR => self.binary(frame, word::shr),
            SAR => self.binary(frame, word::sar),

            // ================================================================
            // Hashing
            // ================================================================
            KECCAK256 => self.keccak256(frame),

            // ================================================================
            // Environment
            // ================================================================
            ADDRESS
            | ORIGIN
            | CALLER
            | CALLDATASIZE
            | CODESIZE
            | GASPRICE
            | RETURNDATASIZE
            | COINBASE
            | TIMESTAMP
            | NUMBER
            | PREVRANDAO
            | GASLIMIT
            | CHAINID
            | SELFBALANCE
            | BASEFEE
            | PC
            | MSIZE
            | GAS => {
                let value = self.context_value(frame, opcode);
                frame.stack.push_safe(value)?;
                Ok(StepResult::Continue)
            }
            CALLVALUE => {
                frame
                    .stack
                    .push(frame.value, TaintFlags::EXTERNAL)?;
                Ok(StepResult::Continue)
            }
            BALANCE | EXTCODESIZE | EXTCODEHASH => self.account_query(frame, opcode),
            CALLDATALOAD => self.calldataload(frame),
            CALLDATACOPY | CODECOPY => self.copy_to_memory(frame, opcode),
            EXTCODECOPY => self.extcodecopy(frame),
            RETURNDATACOPY => self.returndatacopy(frame),

            // ================================================================
            // Block information
            // ================================================================
            BLOCKHASH => self.blockhash(frame),

            // ================================================================
            // Stack, memory and storage
            // ================================================================
            POP => {
                frame.stack.pop()?;
                Ok(StepResult::Continue)
            }
            MLOAD => self.mload(frame),
            MSTORE => self.mstore(frame),
            MSTORE8 => self.mstore8(frame),
            SLOAD => self.sload(frame),
            SSTORE => self.sstore(frame),

            // ================================================================
            // Control flow
            // ================================================================
            JUMP => self.jump(frame),
            JUMPI => self.jumpi(frame),
            JUMPDEST => Ok(StepResult::Continue),

            // ================================================================
            // Push, duplicate and exchange
            // ================================================================
            PUSH0 => {
                frame.stack.push_safe(Word::ZERO)?;
                Ok(StepResult::Continue)
            }
            PUSH1..=PUSH32 => {
                let value = frame
                    .code
                    .push_operand(frame.pc.offset(), opcodes::push_width(opcode));
                frame.stack.push_safe(value)?;
                Ok(StepResult::Continue)
            }
            DUP1..=DUP16 => {
                frame.stack.dup(usize::from(opcode - DUP1) + 1)?;
                Ok(StepResult::Continue)
            }
            SWAP1..=SWAP16 => {
                frame.stack.swap(usize::from(opcode - SWAP1) + 1)?;
                Ok(StepResult::Continue)
            }

            // ================================================================
            // Logging
            // ================================================================
            LOG0..=LOG4 => self.log(frame, opcode),

            // ================================================================
            // Calls and contract creation
            // ================================================================
            CALL | CALLCODE | DELEGATECALL | STATICCALL => self.call(frame, opcode),
            CREATE | CREATE2 => self.create(frame, opcode),

            // ================================================================
            // Frame termination
            // ================================================================
            RETURN => self.halt_with_output(frame, FrameStatus::Returned),
            REVERT => self.halt_with_output(frame, FrameStatus::Reverted),
            SELFDESTRUCT => self.selfdestruct(frame),

            _ => Err(EmulationError::InvalidOpcode {
                opcode,
                pc: frame.pc.offset(),
            }
            .into()),
        }
    }

    /// Builds the outcome of a terminated frame and reports it.
    fn finish_frame(&mut self, frame: &mut CallFrame, status: FrameStatus) -> FrameOutcome {
        let output = match status {
            FrameStatus::Returned | FrameStatus::Reverted => mem::take(&mut frame.output),
            _ => Vec::new(),
        };

        if let FrameStatus::Faulted(error) = &status {
            frame.gas.exhaust();
            debug!(
                depth = frame.depth,
                pc = frame.pc.offset(),
                %error,
                "frame faulted"
            );
        } else {
            debug!(depth = frame.depth, %status, output_len = output.len(), "frame finished");
        }

        if self.config.tracing.trace_calls {
            self.emit(|| TraceEvent::Return {
                depth: frame.depth,
                status: status.to_string(),
                output_len: output.len(),
                output_taint: cell_taint(&output),
            });
        }

        FrameOutcome {
            status,
            output,
            gas_left: frame.gas.remaining(),
        }
    }

    /// Returns `true` if a jump should stop the frame because the abort signal is raised.
    fn abort_requested(&self) -> bool {
        self.abort.is_aborted()
    }

    fn trace_instruction(&self, frame: &CallFrame, opcode: u8) {
        if !self.config.tracing.trace_instructions {
            return;
        }
        self.emit(|| TraceEvent::Instruction {
            depth: frame.depth,
            pc: frame.pc.offset(),
            opcode,
            mnemonic: opcodes::mnemonic(opcode).unwrap_or("UNKNOWN"),
            stack_depth: frame.stack.len(),
            top_taint: frame.stack.peek(0).ok().map(|slot| slot.taint),
            gas_left: frame.gas.remaining(),
        });
    }

    fn trace_call(&self, kind: CallKind, frame: &CallFrame) {
        if !self.config.tracing.trace_calls {
            return;
        }
        self.emit(|| TraceEvent::Call {
            depth: frame.depth,
            kind,
            code_address: frame.code_address,
            gas: frame.gas.limit(),
        });
    }

    /// Writes a trace event if a writer is attached. The event is only built when needed.
    fn emit(&self, event: impl FnOnce() -> TraceEvent) {
        if let Some(tracer) = self.tracer {
            tracer.write(event());
        }
    }
}
