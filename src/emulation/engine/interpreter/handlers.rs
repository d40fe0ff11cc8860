//! Opcode handlers for the interpreter.
//!
//! Every handler pops its operands together with their tags, writes its results together with
//! the tags derived from them, and returns how the program counter moves on. Handlers that
//! detect something worth reporting (wrapping arithmetic on external data, tainted branch
//! conditions, taken jumps, returned data) record it in the session; nothing recorded there
//! feeds back into execution.

use alloy_primitives::keccak256;
use tracing::debug;

use crate::{
    assembly::opcodes::{self, *},
    emulation::{
        cell_bytes, cell_taint,
        engine::{
            arithmetic::{self, BranchDistance},
            context::CallFrame,
            error::EmulationError,
            gas,
            result::{FrameStatus, StepResult},
            trace::TraceEvent,
        },
        guard,
        process::{hash_word, Log},
        word, TaintFlags, Word,
    },
    Result,
};

use super::Interpreter;

impl Interpreter<'_> {
    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// `ADD`, `SUB` and `MUL` with overflow detection.
    ///
    /// The result tag is the OR of the operand tags. If the operation wrapped and an operand is
    /// external, the finding bits from [`Self::overflow_finding`] are added as well.
    pub(super) fn checked_arithmetic(
        &mut self,
        frame: &mut CallFrame,
        opcode: u8,
    ) -> Result<StepResult> {
        let [a, b] = frame.stack.pop_n::<2>()?;

        let (result, wrapped) = match opcode {
            ADD => (
                a.value.wrapping_add(b.value),
                arithmetic::add_overflows(a.value, b.value),
            ),
            SUB => (
                a.value.wrapping_sub(b.value),
                arithmetic::sub_underflows(a.value, b.value),
            ),
            _ => (
                a.value.wrapping_mul(b.value),
                arithmetic::mul_overflows(a.value, b.value),
            ),
        };

        let operands = a.taint | b.taint;
        let finding = self.overflow_finding(frame, opcode, operands, wrapped);
        frame.stack.push(result, operands | finding)?;
        Ok(StepResult::Continue)
    }

    /// `ADDMOD`. A zero modulus yields zero and skips detection.
    pub(super) fn addmod(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [a, b, n] = frame.stack.pop_n::<3>()?;
        let operands = a.taint | b.taint | n.taint;

        if n.value.is_zero() {
            frame.stack.push(Word::ZERO, operands)?;
            return Ok(StepResult::Continue);
        }

        let result = a.value.add_mod(b.value, n.value);
        let wrapped = arithmetic::addmod_wraps(a.value, b.value, result);
        let finding = self.overflow_finding(frame, ADDMOD, operands, wrapped);
        frame.stack.push(result, operands | finding)?;
        Ok(StepResult::Continue)
    }

    /// Classifies a wrapped arithmetic result and records the finding.
    ///
    /// Returns the empty set unless the operation wrapped and `operands` carries
    /// [`TaintFlags::EXTERNAL`]. Otherwise returns `POTENTIAL_OVERFLOW` together with
    /// `PROTECTED_OVERFLOW` when a guard idiom surrounds the instruction, or `OVERFLOW` when none
    /// does.
    fn overflow_finding(
        &mut self,
        frame: &CallFrame,
        opcode: u8,
        operands: TaintFlags,
        wrapped: bool,
    ) -> TaintFlags {
        if !wrapped || !operands.is_external() {
            return TaintFlags::SAFE;
        }

        let pc = frame.pc.offset();
        let template = guard::matching_template(opcode, pc, frame.code.bytes());
        let finding = TaintFlags::POTENTIAL_OVERFLOW
            | if template.is_some() {
                TaintFlags::PROTECTED_OVERFLOW
            } else {
                TaintFlags::OVERFLOW
            };

        self.session.record_flags(finding);
        debug!(
            depth = frame.depth,
            pc,
            op = opcodes::mnemonic(opcode).unwrap_or("UNKNOWN"),
            guarded = template.is_some(),
            "external arithmetic wrapped"
        );

        if self.config.tracing.trace_findings {
            self.emit(|| TraceEvent::Overflow {
                pc,
                opcode,
                flags: finding,
                guard: template.map(|template| template.name),
            });
        }

        finding
    }

    /// `EXP`, charging for the byte length of the exponent.
    pub(super) fn exp(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [base, exponent] = frame.stack.pop_n::<2>()?;

        let exponent_bytes = u64::try_from(exponent.value.byte_len()).unwrap_or(u64::MAX);
        frame
            .gas
            .charge(gas::EXP_BYTE.saturating_mul(exponent_bytes))?;

        frame.stack.push(
            base.value.wrapping_pow(exponent.value),
            base.taint | exponent.taint,
        )?;
        Ok(StepResult::Continue)
    }

    /// Applies a one-operand operation; the tag passes through.
    pub(super) fn unary(
        &mut self,
        frame: &mut CallFrame,
        op: impl FnOnce(Word) -> Word,
    ) -> Result<StepResult> {
        let a = frame.stack.pop()?;
        frame.stack.push(op(a.value), a.taint)?;
        Ok(StepResult::Continue)
    }

    /// Applies a two-operand operation with the top of the stack as first argument.
    pub(super) fn binary(
        &mut self,
        frame: &mut CallFrame,
        op: impl FnOnce(Word, Word) -> Word,
    ) -> Result<StepResult> {
        let [a, b] = frame.stack.pop_n::<2>()?;
        frame.stack.push(op(a.value, b.value), a.taint | b.taint)?;
        Ok(StepResult::Continue)
    }

    /// Applies a three-operand operation with the top of the stack as first argument.
    pub(super) fn ternary(
        &mut self,
        frame: &mut CallFrame,
        op: impl FnOnce(Word, Word, Word) -> Word,
    ) -> Result<StepResult> {
        let [a, b, c] = frame.stack.pop_n::<3>()?;
        frame
            .stack
            .push(op(a.value, b.value, c.value), a.taint | b.taint | c.taint)?;
        Ok(StepResult::Continue)
    }

    // ========================================================================
    // Comparisons
    // ========================================================================

    /// `LT`, `GT` and `EQ`.
    ///
    /// When an operand is external and the result directly feeds a `JUMPI`, the branch distance
    /// is appended to the cost record and the result tag gains [`TaintFlags::BRANCH`].
    pub(super) fn tracked_comparison(
        &mut self,
        frame: &mut CallFrame,
        opcode: u8,
    ) -> Result<StepResult> {
        let [x, y] = frame.stack.pop_n::<2>()?;

        let (outcome, distance): (bool, fn(Word, Word) -> BranchDistance) = match opcode {
            LT => (x.value < y.value, BranchDistance::lt),
            GT => (x.value > y.value, BranchDistance::gt),
            _ => (x.value == y.value, BranchDistance::eq),
        };

        let mut taint = x.taint | y.taint;
        let pc = frame.pc.offset();
        if taint.is_external() && guard::feeds_conditional_jump(pc, frame.code.bytes()) {
            let distance = distance(x.value, y.value);
            self.session.record_branch(pc, distance);
            self.session.record_flags(TaintFlags::BRANCH);
            taint |= TaintFlags::BRANCH;

            if self.config.tracing.trace_findings {
                self.emit(|| TraceEvent::BranchCost { pc, distance });
            }
        }

        frame.stack.push(word::from_bool(outcome), taint)?;
        Ok(StepResult::Continue)
    }

    // ========================================================================
    // Hashing
    // ========================================================================

    /// `KECCAK256`; the digest carries the OR of the hashed bytes' tags.
    pub(super) fn keccak256(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [offset, len] = frame.stack.pop_n::<2>()?;
        let (offset, len) = self.expand_memory(frame, offset.value, len.value)?;
        frame
            .gas
            .charge(gas::KECCAK256_WORD.saturating_mul(gas::words(len)))?;

        let digest = keccak256(frame.memory.read_bytes(offset, len));
        let taint = frame.memory.taint_of(offset, len);
        frame.stack.push(hash_word(digest), taint)?;
        Ok(StepResult::Continue)
    }

    // ========================================================================
    // Environment and block information
    // ========================================================================

    /// Values of the execution context that take no operands. All of them are untainted.
    pub(super) fn context_value(&self, frame: &CallFrame, opcode: u8) -> Word {
        let environment = self.host.environment();
        match opcode {
            ADDRESS => word::from_address(frame.address),
            ORIGIN => word::from_address(environment.origin),
            CALLER => word::from_address(frame.caller),
            CALLDATASIZE => Word::from(frame.input.len()),
            CODESIZE => Word::from(frame.code.len()),
            GASPRICE => environment.gas_price,
            RETURNDATASIZE => Word::from(frame.return_data.len()),
            COINBASE => word::from_address(environment.coinbase),
            TIMESTAMP => Word::from(environment.timestamp),
            NUMBER => Word::from(environment.number),
            PREVRANDAO => hash_word(environment.prevrandao),
            GASLIMIT => Word::from(environment.gas_limit),
            CHAINID => Word::from(environment.chain_id),
            SELFBALANCE => self.host.balance(frame.address),
            BASEFEE => environment.base_fee,
            PC => Word::from(frame.pc.offset()),
            MSIZE => Word::from(frame.memory.len()),
            GAS => Word::from(frame.gas.remaining()),
            _ => Word::ZERO,
        }
    }

    /// `BALANCE`, `EXTCODESIZE` and `EXTCODEHASH`.
    pub(super) fn account_query(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        let address = word::to_address(frame.stack.pop()?.value);
        let value = match opcode {
            BALANCE => self.host.balance(address),
            EXTCODESIZE => Word::from(self.host.code(address).len()),
            _ => self.host.code_hash(address),
        };
        frame.stack.push_safe(value)?;
        Ok(StepResult::Continue)
    }

    /// `CALLDATALOAD`: 32 bytes of input, zero-padded, tagged external.
    ///
    /// A load at the configured selector offset is left untainted, so that function dispatch
    /// does not mark every branch of a contract as input driven.
    pub(super) fn calldataload(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let offset = frame.stack.pop()?;
        let value = input_word(&frame.input, offset.value);

        let taint = if self.config.selector_load_pc == Some(frame.pc.offset()) {
            TaintFlags::SAFE
        } else {
            TaintFlags::EXTERNAL
        };
        frame.stack.push(value, taint)?;
        Ok(StepResult::Continue)
    }

    /// `CALLDATACOPY` (bytes tagged external) and `CODECOPY` (bytes untainted).
    pub(super) fn copy_to_memory(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        let [destination, source, len] = frame.stack.pop_n::<3>()?;
        let (destination, len) = self.expand_memory(frame, destination.value, len.value)?;
        frame.gas.charge(gas::copy_cost(len))?;

        let source = word::as_usize_saturated(source.value);
        if opcode == CALLDATACOPY {
            frame
                .memory
                .copy_padded(destination, &frame.input, source, len, TaintFlags::EXTERNAL);
        } else {
            frame
                .memory
                .copy_padded(destination, frame.code.bytes(), source, len, TaintFlags::SAFE);
        }
        Ok(StepResult::Continue)
    }

    /// `EXTCODECOPY`; copied bytes are untainted.
    pub(super) fn extcodecopy(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [address, destination, source, len] = frame.stack.pop_n::<4>()?;
        let (destination, len) = self.expand_memory(frame, destination.value, len.value)?;
        frame.gas.charge(gas::copy_cost(len))?;

        let code = self.host.code(word::to_address(address.value));
        frame.memory.copy_padded(
            destination,
            code.bytes(),
            word::as_usize_saturated(source.value),
            len,
            TaintFlags::SAFE,
        );
        Ok(StepResult::Continue)
    }

    /// `RETURNDATACOPY`; each byte keeps the tag it had in the child's output.
    pub(super) fn returndatacopy(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [destination, source, len] = frame.stack.pop_n::<3>()?;

        let start = word::as_usize_saturated(source.value);
        let count = word::as_usize_saturated(len.value);
        let available = frame.return_data.len();
        let end = start
            .checked_add(count)
            .filter(|end| *end <= available)
            .ok_or(EmulationError::ReturnDataOutOfBounds {
                requested: start.saturating_add(count),
                available,
            })?;

        let (destination, len) = self.expand_memory(frame, destination.value, len.value)?;
        frame.gas.charge(gas::copy_cost(len))?;
        frame
            .memory
            .write_cells(destination, &frame.return_data[start..end]);
        Ok(StepResult::Continue)
    }

    /// `BLOCKHASH`. Inside the 256-block window the hash carries the tag of the block number.
    pub(super) fn blockhash(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let number = frame.stack.pop()?;
        let current = Word::from(self.host.environment().number);

        if number.value < current && current - number.value <= Word::from(256u64) {
            let hash = self.host.block_hash(word::as_u64_saturated(number.value));
            frame.stack.push(hash_word(hash), number.taint)?;
        } else {
            frame.stack.push_safe(Word::ZERO)?;
        }
        Ok(StepResult::Continue)
    }

    // ========================================================================
    // Memory and storage
    // ========================================================================

    /// Grows memory to cover `[offset, offset + len)` and charges for the expansion.
    ///
    /// Returns the range narrowed to `usize`. Zero-length ranges touch nothing and come back as
    /// `(0, 0)` whatever their offset.
    pub(super) fn expand_memory(
        &self,
        frame: &mut CallFrame,
        offset: Word,
        len: Word,
    ) -> Result<(usize, usize)> {
        if len.is_zero() {
            return Ok((0, 0));
        }

        let offset = word::as_usize_saturated(offset);
        let len = word::as_usize_saturated(len);
        let limit = self.config.limits.max_memory_bytes;
        let aligned = offset
            .checked_add(len)
            .and_then(|end| end.checked_next_multiple_of(32));
        let Some(aligned) = aligned.filter(|&aligned| aligned <= limit) else {
            return Err(EmulationError::MemoryLimitExceeded {
                requested: offset.saturating_add(len),
                limit,
            }
            .into());
        };

        frame.gas.charge_memory(frame.memory.len(), aligned)?;
        frame.memory.resize(offset, len);
        Ok((offset, len))
    }

    /// `MLOAD`; the loaded word carries the OR of its 32 byte tags.
    pub(super) fn mload(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let offset = frame.stack.pop()?;
        let (offset, _) = self.expand_memory(frame, offset.value, Word::from(32u64))?;
        let (value, taint) = frame.memory.load_word(offset);
        frame.stack.push(value, taint)?;
        Ok(StepResult::Continue)
    }

    /// `MSTORE`; all 32 written bytes take the tag of the stored word.
    pub(super) fn mstore(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [offset, value] = frame.stack.pop_n::<2>()?;
        let (offset, _) = self.expand_memory(frame, offset.value, Word::from(32u64))?;
        frame.memory.store_word(offset, value.value, value.taint);
        Ok(StepResult::Continue)
    }

    /// `MSTORE8`.
    pub(super) fn mstore8(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let [offset, value] = frame.stack.pop_n::<2>()?;
        let (offset, _) = self.expand_memory(frame, offset.value, Word::from(1u64))?;
        let byte = value.value.to_be_bytes::<32>()[31];
        frame.memory.store_byte(offset, byte, value.taint);
        Ok(StepResult::Continue)
    }

    /// `SLOAD`. Storage is taint-opaque.
    pub(super) fn sload(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        let key = frame.stack.pop()?;
        let value = self.host.storage(frame.address, key.value);
        frame.stack.push_safe(value)?;
        Ok(StepResult::Continue)
    }

    /// `SSTORE`. The tag of the stored value is dropped.
    pub(super) fn sstore(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        if frame.is_static {
            return Err(EmulationError::WriteProtection { opcode: SSTORE }.into());
        }
        let [key, value] = frame.stack.pop_n::<2>()?;

        let previous = self.host.storage(frame.address, key.value);
        let cost = if previous.is_zero() && !value.value.is_zero() {
            gas::SSTORE_SET
        } else {
            gas::SSTORE_RESET
        };
        frame.gas.charge(cost)?;

        self.host.set_storage(frame.address, key.value, value.value);
        Ok(StepResult::Continue)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    /// `JUMP`. Polls the abort signal before jumping.
    pub(super) fn jump(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        if self.abort_requested() {
            return Ok(StepResult::Halt(FrameStatus::Aborted));
        }

        let destination = frame.stack.pop()?;
        let target = jump_target(frame, destination.value)?;
        self.trace_jump(frame, target, false);
        Ok(StepResult::Jump { target })
    }

    /// `JUMPI`. Polls the abort signal; a taken jump is appended to the path record.
    pub(super) fn jumpi(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        if self.abort_requested() {
            return Ok(StepResult::Halt(FrameStatus::Aborted));
        }

        let [destination, condition] = frame.stack.pop_n::<2>()?;
        if condition.value.is_zero() {
            return Ok(StepResult::Continue);
        }

        let target = jump_target(frame, destination.value)?;
        self.session.record_jump(frame.pc.offset(), target);
        self.trace_jump(frame, target, true);
        Ok(StepResult::Jump { target })
    }

    fn trace_jump(&self, frame: &CallFrame, target: usize, conditional: bool) {
        if self.config.tracing.trace_instructions {
            self.emit(|| TraceEvent::Jump {
                depth: frame.depth,
                from: frame.pc.offset(),
                to: target,
                conditional,
            });
        }
    }

    // ========================================================================
    // Logging and termination
    // ========================================================================

    /// `LOG0`..`LOG4`. The log tag is the OR of the data bytes' and topics' tags.
    pub(super) fn log(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        if frame.is_static {
            return Err(EmulationError::WriteProtection { opcode }.into());
        }
        let topic_count = opcodes::log_topics(opcode).unwrap_or(0);
        frame.stack.require(2 + topic_count)?;

        let [offset, len] = frame.stack.pop_n::<2>()?;
        let mut taint = TaintFlags::SAFE;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            let topic = frame.stack.pop()?;
            taint |= topic.taint;
            topics.push(word::to_b256(topic.value));
        }

        let (offset, len) = self.expand_memory(frame, offset.value, len.value)?;
        let topic_cost = gas::LOG_TOPIC.saturating_mul(topics.len() as u64);
        let data_cost = gas::LOG_BYTE.saturating_mul(u64::try_from(len).unwrap_or(u64::MAX));
        frame.gas.charge(topic_cost.saturating_add(data_cost))?;

        let data = frame.memory.read_cells(offset, len);
        taint |= cell_taint(&data);
        self.host.emit_log(Log {
            address: frame.address,
            topics,
            data: cell_bytes(&data),
            taint,
        });
        Ok(StepResult::Continue)
    }

    /// `RETURN` and `REVERT`.
    ///
    /// The output keeps its per-byte tags for the caller, and the OR of those tags is merged
    /// into the aggregation state. Revert differs only in the status.
    pub(super) fn halt_with_output(
        &mut self,
        frame: &mut CallFrame,
        status: FrameStatus,
    ) -> Result<StepResult> {
        let [offset, len] = frame.stack.pop_n::<2>()?;
        let (offset, len) = self.expand_memory(frame, offset.value, len.value)?;

        frame.output = frame.memory.read_cells(offset, len);
        self.session.record_flags(cell_taint(&frame.output));
        Ok(StepResult::Halt(status))
    }

    /// `SELFDESTRUCT`.
    pub(super) fn selfdestruct(&mut self, frame: &mut CallFrame) -> Result<StepResult> {
        if frame.is_static {
            return Err(EmulationError::WriteProtection {
                opcode: SELFDESTRUCT,
            }
            .into());
        }
        let beneficiary = frame.stack.pop()?;
        self.host
            .self_destruct(frame.address, word::to_address(beneficiary.value));
        Ok(StepResult::Halt(FrameStatus::SelfDestructed))
    }
}

/// Validates a jump destination against the frame's `JUMPDEST` map.
fn jump_target(frame: &CallFrame, destination: Word) -> Result<usize> {
    let target = word::as_usize_saturated(destination);
    if frame.code.is_jumpdest(target) {
        Ok(target)
    } else {
        Err(EmulationError::InvalidJump {
            pc: frame.pc.offset(),
            target,
        }
        .into())
    }
}

/// Reads the 32-byte word of `input` at `offset`, zero-padded past the end.
fn input_word(input: &[u8], offset: Word) -> Word {
    let mut buffer = [0u8; 32];
    if let Some(tail) = input.get(word::as_usize_saturated(offset)..) {
        let count = tail.len().min(32);
        buffer[..count].copy_from_slice(&tail[..count]);
    }
    Word::from_be_bytes(buffer)
}
