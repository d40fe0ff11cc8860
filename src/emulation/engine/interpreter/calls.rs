//! Nested message calls and contract creation.
//!
//! A call runs to completion in a fresh [`CallFrame`] before the parent continues. The child's
//! output cells, tags included, become the parent's return data and are copied into the
//! parent's memory, so taint flows back from callee to caller byte by byte.
//!
//! Each child runs under a host checkpoint. Its state changes, value transfer included, are
//! kept only if it succeeds.

use alloy_primitives::Address;
use tracing::debug;

use crate::{
    assembly::{opcodes::*, Bytecode},
    emulation::{
        cell_bytes,
        engine::{
            context::{CallFrame, CallKind},
            error::EmulationError,
            gas,
            result::{FrameOutcome, FrameStatus, StepResult},
        },
        word, Word,
    },
    Result,
};

use super::Interpreter;

impl Interpreter<'_> {
    /// `CALL`, `CALLCODE`, `DELEGATECALL` and `STATICCALL`.
    ///
    /// Pushes 1 if the child succeeded and 0 otherwise. A child that cannot start (too deep,
    /// insufficient balance) fails without running and returns its gas.
    pub(super) fn call(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        let kind = match opcode {
            CALL => CallKind::Call,
            CALLCODE => CallKind::CallCode,
            DELEGATECALL => CallKind::DelegateCall,
            _ => CallKind::StaticCall,
        };
        let carries_value = matches!(kind, CallKind::Call | CallKind::CallCode);
        frame.stack.require(if carries_value { 7 } else { 6 })?;

        let [requested_gas, target] = frame.stack.pop_n::<2>()?;
        let value = if carries_value {
            frame.stack.pop()?.value
        } else {
            Word::ZERO
        };
        let [in_offset, in_len, out_offset, out_len] = frame.stack.pop_n::<4>()?;

        if kind == CallKind::Call && frame.is_static && !value.is_zero() {
            return Err(EmulationError::WriteProtection { opcode }.into());
        }

        let (in_offset, in_len) = self.expand_memory(frame, in_offset.value, in_len.value)?;
        let (out_offset, out_len) = self.expand_memory(frame, out_offset.value, out_len.value)?;
        let target = word::to_address(target.value);

        if !value.is_zero() {
            let mut cost = gas::CALL_VALUE;
            if kind == CallKind::Call && !self.host.exists(target) {
                cost += gas::NEW_ACCOUNT;
            }
            frame.gas.charge(cost)?;
        }

        let forwarded = word::as_u64_saturated(requested_gas.value)
            .min(gas::max_call_gas(frame.gas.remaining()));
        frame.gas.charge(forwarded)?;
        let child_gas = if value.is_zero() {
            forwarded
        } else {
            forwarded.saturating_add(gas::CALL_STIPEND)
        };

        frame.return_data.clear();
        let input = frame.memory.read_bytes(in_offset, in_len);
        let depth = frame.depth + 1;

        let checkpoint = self.host.checkpoint();
        let outcome = if depth > self.config.limits.max_call_depth {
            Ok(FrameOutcome::empty(
                FrameStatus::Faulted(EmulationError::CallDepthExceeded {
                    depth,
                    limit: self.config.limits.max_call_depth,
                }),
                child_gas,
            ))
        } else if !self.move_call_value(kind, frame.address, target, value) {
            debug!(depth, %kind, %value, "insufficient balance for call value");
            Ok(FrameOutcome::empty(FrameStatus::Reverted, child_gas))
        } else {
            let (address, caller, call_value, is_static) = match kind {
                CallKind::Call => (target, frame.address, value, frame.is_static),
                CallKind::CallCode => (frame.address, frame.address, value, frame.is_static),
                CallKind::DelegateCall => (frame.address, frame.caller, frame.value, frame.is_static),
                _ => (target, frame.address, Word::ZERO, true),
            };
            let mut child = CallFrame::new(
                self.host.code(target),
                input,
                address,
                target,
                caller,
                call_value,
                child_gas,
                is_static,
                depth,
            );
            self.trace_call(kind, &child);
            self.run_frame(&mut child)
        };
        let outcome = self.settle(checkpoint, outcome)?;

        if let FrameStatus::Faulted(error) = &outcome.status {
            debug!(depth, %kind, %target, %error, "child call faulted");
        }
        if outcome.status == FrameStatus::Aborted {
            return Ok(StepResult::Halt(FrameStatus::Aborted));
        }

        frame.gas.refund(outcome.gas_left);
        let success = outcome.status.is_success();
        let copied = outcome.output.len().min(out_len);
        frame
            .memory
            .write_cells(out_offset, &outcome.output[..copied]);
        frame.return_data = outcome.output;

        frame.stack.push_safe(word::from_bool(success))?;
        Ok(StepResult::Continue)
    }

    /// Moves call value before the child runs. `CALLCODE` sends value to itself, so only the
    /// balance is checked.
    fn move_call_value(&self, kind: CallKind, from: Address, to: Address, value: Word) -> bool {
        match kind {
            _ if value.is_zero() => true,
            CallKind::Call => self.host.transfer(from, to, value),
            CallKind::CallCode => self.host.balance(from) >= value,
            _ => true,
        }
    }

    /// `CREATE` and `CREATE2`.
    ///
    /// Pushes the new address on success and 0 otherwise. Revert data of failed init code is
    /// kept as return data; successful creation leaves the return data empty.
    pub(super) fn create(&mut self, frame: &mut CallFrame, opcode: u8) -> Result<StepResult> {
        if frame.is_static {
            return Err(EmulationError::WriteProtection { opcode }.into());
        }
        let is_create2 = opcode == CREATE2;
        frame.stack.require(if is_create2 { 4 } else { 3 })?;

        let [value, offset, len] = frame.stack.pop_n::<3>()?;
        let salt = if is_create2 {
            Some(word::to_b256(frame.stack.pop()?.value))
        } else {
            None
        };

        let (offset, len) = self.expand_memory(frame, offset.value, len.value)?;
        if salt.is_some() {
            frame
                .gas
                .charge(gas::KECCAK256_WORD.saturating_mul(gas::words(len)))?;
        }
        let init_code = frame.memory.read_bytes(offset, len);

        let forwarded = gas::max_call_gas(frame.gas.remaining());
        frame.gas.charge(forwarded)?;
        frame.return_data.clear();

        let nonce = self.host.bump_nonce(frame.address);
        let (kind, address) = match salt {
            Some(salt) => (
                CallKind::Create2,
                frame.address.create2_from_code(salt, &init_code),
            ),
            None => (CallKind::Create, frame.address.create(nonce)),
        };

        let checkpoint = self.host.checkpoint();
        let outcome = if self.host.transfer(frame.address, address, value.value) {
            self.deploy(
                kind,
                frame.address,
                address,
                value.value,
                init_code,
                forwarded,
                frame.depth + 1,
            )
        } else {
            debug!(depth = frame.depth + 1, %kind, "insufficient balance for endowment");
            Ok(FrameOutcome::empty(FrameStatus::Reverted, forwarded))
        };
        let outcome = self.settle(checkpoint, outcome)?;

        if outcome.status == FrameStatus::Aborted {
            return Ok(StepResult::Halt(FrameStatus::Aborted));
        }

        frame.gas.refund(outcome.gas_left);
        let created = if outcome.status.is_success() {
            word::from_address(address)
        } else {
            frame.return_data = outcome.output;
            Word::ZERO
        };
        frame.stack.push_safe(created)?;
        Ok(StepResult::Continue)
    }

    /// Runs init code at `address` and installs the returned bytes as its code.
    ///
    /// Value is not moved here; callers open a checkpoint and transfer the endowment first, so
    /// a failed deployment hands the endowment back. A successful outcome has empty output and
    /// its gas reduced by the code deposit charge.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn deploy(
        &mut self,
        kind: CallKind,
        caller: Address,
        address: Address,
        value: Word,
        init_code: Vec<u8>,
        gas_limit: u64,
        depth: usize,
    ) -> Result<FrameOutcome> {
        let limit = self.config.limits.max_call_depth;
        if depth > limit {
            return Ok(FrameOutcome::empty(
                FrameStatus::Faulted(EmulationError::CallDepthExceeded { depth, limit }),
                gas_limit,
            ));
        }

        let mut child = CallFrame::new(
            Bytecode::new(init_code),
            Vec::<u8>::new(),
            address,
            address,
            caller,
            value,
            gas_limit,
            false,
            depth,
        );
        self.trace_call(kind, &child);
        let mut outcome = self.run_frame(&mut child)?;

        if outcome.status.is_success() {
            let code = cell_bytes(&outcome.output);
            let deposit = gas::CODE_DEPOSIT_BYTE
                .saturating_mul(u64::try_from(code.len()).unwrap_or(u64::MAX));
            if deposit > outcome.gas_left {
                let error = EmulationError::OutOfGas {
                    required: deposit,
                    remaining: outcome.gas_left,
                };
                debug!(depth, %address, %error, "code deposit failed");
                return Ok(FrameOutcome::empty(FrameStatus::Faulted(error), 0));
            }

            debug!(depth, %address, code_len = code.len(), "contract deployed");
            self.host.install_code(address, Bytecode::new(code));
            outcome.gas_left -= deposit;
            outcome.output.clear();
        }

        Ok(outcome)
    }
}
